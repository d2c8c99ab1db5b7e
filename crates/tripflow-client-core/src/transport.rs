use async_trait::async_trait;

use crate::model::{
    AckResponse, CurrentUserResponse, GenerateRequest, GenerateResponse, ItineraryEntry,
    ItineraryId, LoginRequest, SendCodeRequest,
};
use crate::sidebar::Panel;

/// Remote calls consumed by the controller.
///
/// `Err` means the call itself failed (network, HTTP status, decoding). A
/// server that answered with `success: false` is an `Ok` response.
#[async_trait]
pub trait TripApiTransport: Send + Sync {
    type Error: std::fmt::Display + Send;

    async fn current_user(&self) -> Result<CurrentUserResponse, Self::Error>;
    async fn generate_itinerary(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, Self::Error>;
    async fn bookmark(&self, id: &ItineraryId) -> Result<AckResponse, Self::Error>;
    async fn history(&self) -> Result<Vec<ItineraryEntry>, Self::Error>;
    async fn saved_list(&self) -> Result<Vec<ItineraryEntry>, Self::Error>;
    async fn send_code(&self, request: &SendCodeRequest) -> Result<AckResponse, Self::Error>;
    async fn login(&self, request: &LoginRequest) -> Result<AckResponse, Self::Error>;
    async fn logout(&self) -> Result<(), Self::Error>;

    async fn list_panel(&self, panel: Panel) -> Result<Vec<ItineraryEntry>, Self::Error> {
        match panel {
            Panel::History => self.history().await,
            Panel::Saved => self.saved_list().await,
        }
    }
}
