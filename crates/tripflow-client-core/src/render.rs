//! Itinerary → display model.
//!
//! The builder is a pure transform. Day order and the spot order inside each
//! day are taken verbatim from the payload; nothing is re-sorted.

use url::form_urlencoded;

use crate::model::{DayPlan, Itinerary, Spot};

pub const NAVIGATION_SEARCH_URL: &str = "https://uri.amap.com/search";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedItinerary {
    pub title: String,
    pub body: RenderBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBody {
    /// The payload carried no day list.
    NoContent,
    Days(Vec<RenderedDay>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDay {
    /// 1-based `Day N` label.
    pub badge: String,
    pub title: String,
    pub spots: Vec<RenderedSpot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSpot {
    pub name: String,
    pub time: String,
    pub reason: String,
    pub description: String,
    pub navigation_url: String,
}

impl RenderedItinerary {
    #[must_use]
    pub fn days(&self) -> &[RenderedDay] {
        match &self.body {
            RenderBody::NoContent => &[],
            RenderBody::Days(days) => days,
        }
    }

    #[must_use]
    pub fn has_content(&self) -> bool {
        matches!(self.body, RenderBody::Days(_))
    }
}

#[must_use]
pub fn build(itinerary: &Itinerary) -> RenderedItinerary {
    let body = match &itinerary.days {
        None => RenderBody::NoContent,
        Some(days) => RenderBody::Days(
            days.iter()
                .enumerate()
                .map(|(index, day)| render_day(index, day))
                .collect(),
        ),
    };
    RenderedItinerary {
        title: itinerary.title.clone(),
        body,
    }
}

fn render_day(index: usize, day: &DayPlan) -> RenderedDay {
    RenderedDay {
        badge: format!("Day {}", index + 1),
        title: day.day_title.clone(),
        spots: day.spots.iter().map(render_spot).collect(),
    }
}

fn render_spot(spot: &Spot) -> RenderedSpot {
    RenderedSpot {
        name: spot.name.clone(),
        time: spot.time.clone(),
        reason: spot.reason.clone(),
        description: spot.description.clone(),
        navigation_url: navigation_url(&spot.name),
    }
}

/// Search link for a spot; the name is query-escaped.
#[must_use]
pub fn navigation_url(spot_name: &str) -> String {
    let keyword = form_urlencoded::byte_serialize(spot_name.as_bytes()).collect::<String>();
    format!("{NAVIGATION_SEARCH_URL}?keyword={keyword}")
}
