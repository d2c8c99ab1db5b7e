use std::fmt::Write as _;

use clap::{Parser, Subcommand};
use tracing::debug;
use tripflow_client_core::auth::AuthSurface;
use tripflow_client_core::config::{ApiSettings, MIN_TIMEOUT_MS, normalize_base_url};
use tripflow_client_core::controller::{ClientState, Notice, NoticeLevel, TripController};
use tripflow_client_core::error::ControllerError;
use tripflow_client_core::render::{RenderBody, RenderedItinerary};
use tripflow_client_core::sidebar::{Panel, PanelContent};
use tripflow_client_core::transport::TripApiTransport;
use tripflow_client_core::view::{TripForm, ViewState};

#[derive(Parser, Debug)]
#[command(name = "tripflow")]
#[command(about = "Plan trips against a TripFlow server from the terminal")]
pub struct Cli {
    /// Server base URL (overrides TRIPFLOW_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,
    /// Per-request timeout in milliseconds (overrides TRIPFLOW_TIMEOUT_MS)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl Cli {
    /// Environment settings with command-line overrides applied.
    pub fn settings(&self) -> anyhow::Result<ApiSettings> {
        let mut settings = ApiSettings::from_env()?;
        if let Some(base_url) = self.base_url.as_deref() {
            settings.base_url = normalize_base_url(base_url)?;
            settings.base_url_source = "flag".to_string();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_ms = timeout_ms.max(MIN_TIMEOUT_MS);
        }
        Ok(settings)
    }
}

/// One line typed at the prompt.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
pub struct ReplLine {
    #[command(subcommand)]
    pub command: ReplCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Generate an itinerary: plan <days> <city>
    Plan {
        days: u32,
        #[arg(required = true, num_args = 1..)]
        city: Vec<String>,
    },
    /// Leave the result view
    Back,
    /// Toggle a preference tag
    Tag {
        #[arg(required = true, num_args = 1..)]
        label: Vec<String>,
    },
    /// Toggle the history panel
    History,
    /// Toggle the saved panel
    Saved,
    /// Open entry <index> of the open panel
    Select { index: usize },
    /// Close any open panel
    Close,
    /// Save the current itinerary
    Bookmark,
    /// Toggle the login dialog
    Auth,
    /// Email a verification code
    SendCode { email: String },
    /// Log in with an emailed code
    Login {
        email: String,
        #[arg(required = true, num_args = 1..)]
        code: Vec<String>,
    },
    Logout,
    Status,
    #[command(alias = "exit")]
    Quit,
}

impl ReplCommand {
    pub fn parse_line(line: &str) -> Result<Self, clap::Error> {
        ReplLine::try_parse_from(line.split_whitespace()).map(|parsed| parsed.command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct Step {
    pub flow: Flow,
    pub output: String,
}

pub async fn execute<T: TripApiTransport>(
    controller: &mut TripController<T>,
    command: ReplCommand,
) -> Step {
    let mut output = String::new();
    let mut flow = Flow::Continue;

    match command {
        ReplCommand::Plan { days, city } => {
            if controller.state().view_state() == ViewState::Result {
                controller.return_to_input();
            }
            let form = TripForm {
                city: city.join(" "),
                days,
                ..controller.state().form().clone()
            };
            if settled(controller.request_generation(form).await) {
                output.push_str(&render_view(controller.state()));
            }
        }
        ReplCommand::Back => {
            controller.return_to_input();
            output.push_str(&render_view(controller.state()));
        }
        ReplCommand::Tag { label } => {
            let label = label.join(" ");
            let active = controller.toggle_tag(&label);
            let _ = writeln!(
                output,
                "{label}: {}",
                if active { "selected" } else { "cleared" }
            );
        }
        ReplCommand::History => {
            controller.open_panel(Panel::History).await;
            output.push_str(&render_panel(controller.state()));
        }
        ReplCommand::Saved => {
            controller.open_panel(Panel::Saved).await;
            output.push_str(&render_panel(controller.state()));
        }
        ReplCommand::Select { index } => {
            if settled(controller.select_entry(index)) {
                output.push_str(&render_view(controller.state()));
            }
        }
        ReplCommand::Close => controller.close_sidebars(),
        ReplCommand::Bookmark => {
            settled(controller.bookmark().await);
        }
        ReplCommand::Auth => {
            if controller.state().auth_surface() == AuthSurface::Open {
                controller.close_auth();
            } else {
                controller.open_auth();
            }
            output.push_str(&render_status(controller.state()));
        }
        ReplCommand::SendCode { email } => {
            settled(controller.send_code(&email).await);
            let _ = writeln!(output, "[{}]", controller.state().code_trigger().label);
        }
        ReplCommand::Login { email, code } => {
            settled(controller.login(&email, &code.join(" ")).await);
        }
        ReplCommand::Logout => {
            settled(controller.logout().await);
            output.push_str(&render_status(controller.state()));
        }
        ReplCommand::Status => output.push_str(&render_status(controller.state())),
        ReplCommand::Quit => flow = Flow::Quit,
    }

    output.push_str(&render_notices(&controller.take_notices()));
    Step { flow, output }
}

/// Failures already produced a notice; only keep them in the debug log.
fn settled<V>(result: Result<V, ControllerError>) -> bool {
    match result {
        Ok(_) => true,
        Err(error) => {
            debug!(%error, "command did not complete");
            false
        }
    }
}

#[must_use]
pub fn render_view(state: &ClientState) -> String {
    match (state.view_state(), state.rendered()) {
        (ViewState::Result, Some(rendered)) => render_itinerary(rendered),
        (ViewState::Loading, _) => "Planning...\n".to_string(),
        _ => {
            let form = state.form();
            let mut text = format!("Where to? ({} days", form.days);
            if !form.preferences.is_empty() {
                let _ = write!(text, ", {}", form.preferences.join(", "));
            }
            text.push_str(")\n");
            text
        }
    }
}

#[must_use]
pub fn render_itinerary(rendered: &RenderedItinerary) -> String {
    let mut text = format!("== {} ==\n", rendered.title);
    match &rendered.body {
        RenderBody::NoContent => text.push_str("No itinerary content.\n"),
        RenderBody::Days(days) => {
            for day in days {
                let _ = writeln!(text, "{} · {}", day.badge, day.title);
                for spot in &day.spots {
                    let _ = write!(text, "  - ");
                    if !spot.time.is_empty() {
                        let _ = write!(text, "[{}] ", spot.time);
                    }
                    let _ = writeln!(text, "{}", spot.name);
                    if !spot.reason.is_empty() {
                        let _ = writeln!(text, "      why: {}", spot.reason);
                    }
                    if !spot.description.is_empty() {
                        let _ = writeln!(text, "      {}", spot.description);
                    }
                    let _ = writeln!(text, "      map: {}", spot.navigation_url);
                }
            }
        }
    }
    text
}

#[must_use]
pub fn render_panel(state: &ClientState) -> String {
    let Some(panel) = state.sidebar_state().open_panel() else {
        return String::new();
    };
    let mut text = format!("-- {} --\n", panel.as_str());
    match state.panel_content() {
        None | Some(PanelContent::Loading) => text.push_str("Loading...\n"),
        Some(PanelContent::Empty { message }) => {
            let _ = writeln!(text, "{message}");
        }
        Some(PanelContent::Failed { message }) => {
            let _ = writeln!(text, "Could not load: {message}");
        }
        Some(PanelContent::Entries(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                let _ = writeln!(text, "[{index}] {} ({})", entry.summary(), entry.date);
            }
        }
    }
    text
}

#[must_use]
pub fn render_status(state: &ClientState) -> String {
    let session = state.session();
    let user = match (&session.username, session.is_logged_in) {
        (Some(name), true) => format!("logged in as {name}"),
        _ => "guest".to_string(),
    };
    let panel = state
        .sidebar_state()
        .open_panel()
        .map_or("none", Panel::as_str);
    let itinerary = state
        .current_itinerary_id()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    format!(
        "view: {}\nuser: {user}\nlogin dialog: {:?}\npanel: {panel}\nitinerary: {itinerary}\ncode: {}\n",
        state.view_state(),
        state.auth_surface(),
        state.code_trigger().label,
    )
}

#[must_use]
pub fn render_notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|notice| match notice.level {
            NoticeLevel::Info => format!("* {}\n", notice.message),
            NoticeLevel::Error => format!("! {}\n", notice.message),
        })
        .collect()
}
