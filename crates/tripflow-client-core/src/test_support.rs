use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{
    AckResponse, CurrentUserResponse, DayPlan, GenerateRequest, GenerateResponse, Itinerary,
    ItineraryEntry, ItineraryId, LoginRequest, SendCodeRequest, Spot,
};
use crate::transport::TripApiTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CurrentUser,
    Generate(GenerateRequest),
    Bookmark(String),
    History,
    Saved,
    SendCode(String),
    Login { email: String, code: String },
    Logout,
}

pub struct Script {
    pub current_user: VecDeque<Result<CurrentUserResponse, String>>,
    pub generate: VecDeque<Result<GenerateResponse, String>>,
    pub bookmark: Result<AckResponse, String>,
    pub history: Result<Vec<ItineraryEntry>, String>,
    pub saved: Result<Vec<ItineraryEntry>, String>,
    pub send_code: Result<AckResponse, String>,
    pub send_code_delay: Duration,
    pub login: Result<AckResponse, String>,
    pub logout: Result<(), String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            current_user: VecDeque::new(),
            generate: VecDeque::new(),
            bookmark: Ok(AckResponse::ok()),
            history: Ok(Vec::new()),
            saved: Ok(Vec::new()),
            send_code: Ok(AckResponse::ok()),
            send_code_delay: Duration::ZERO,
            login: Ok(AckResponse::ok()),
            logout: Ok(()),
        }
    }
}

/// In-memory transport that answers from a script and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl TripApiTransport for ScriptedTransport {
    type Error = String;

    async fn current_user(&self) -> Result<CurrentUserResponse, String> {
        self.record(Call::CurrentUser);
        self.script()
            .current_user
            .pop_front()
            .unwrap_or_else(|| Ok(CurrentUserResponse::default()))
    }

    async fn generate_itinerary(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, String> {
        self.record(Call::Generate(request.clone()));
        self.script()
            .generate
            .pop_front()
            .unwrap_or_else(|| Err("no scripted generation".to_string()))
    }

    async fn bookmark(&self, id: &ItineraryId) -> Result<AckResponse, String> {
        self.record(Call::Bookmark(id.to_string()));
        self.script().bookmark.clone()
    }

    async fn history(&self) -> Result<Vec<ItineraryEntry>, String> {
        self.record(Call::History);
        self.script().history.clone()
    }

    async fn saved_list(&self) -> Result<Vec<ItineraryEntry>, String> {
        self.record(Call::Saved);
        self.script().saved.clone()
    }

    async fn send_code(&self, request: &SendCodeRequest) -> Result<AckResponse, String> {
        self.record(Call::SendCode(request.email.clone()));
        let delay = self.script().send_code_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.script().send_code.clone()
    }

    async fn login(&self, request: &LoginRequest) -> Result<AckResponse, String> {
        self.record(Call::Login {
            email: request.email.clone(),
            code: request.code.clone(),
        });
        self.script().login.clone()
    }

    async fn logout(&self) -> Result<(), String> {
        self.record(Call::Logout);
        self.script().logout.clone()
    }
}

pub fn day(title: &str, spots: &[&str]) -> DayPlan {
    DayPlan {
        day_title: title.to_string(),
        spots: spots
            .iter()
            .map(|name| Spot {
                name: (*name).to_string(),
                ..Spot::default()
            })
            .collect(),
    }
}

pub fn itinerary(title: &str, days: Vec<DayPlan>) -> Itinerary {
    Itinerary {
        id: None,
        title: title.to_string(),
        days: Some(days),
    }
}

pub fn entry(id: &str, city: &str) -> ItineraryEntry {
    ItineraryEntry {
        id: ItineraryId::new(id),
        city: city.to_string(),
        days: 2,
        date: "2024-06-01".to_string(),
        content: itinerary(city, vec![day("Arrival", &["Station"])]),
    }
}

pub fn generated(id: Option<&str>, itinerary: Itinerary) -> GenerateResponse {
    GenerateResponse {
        success: true,
        id: id.map(ItineraryId::new),
        data: Some(itinerary),
        error: None,
    }
}
