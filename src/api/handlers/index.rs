use super::Message;
use axum::response::Json;

#[utoipa::path(
    get,
    path= "/",
    responses (
        (status = 200, description = "Greeting", body = Message, content_type = "application/json"),
    ),
    tag= "turnstile"
)]
pub async fn index() -> Json<Message> {
    Json(Message::new("Bienvenue"))
}
