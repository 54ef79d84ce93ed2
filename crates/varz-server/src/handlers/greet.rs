use axum::extract::{Query, State};
use serde::Deserialize;

use crate::app_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct GreetQuery {
    #[serde(default)]
    pub user: String,
}

/// `GET /?user=<name>`. A missing or unparsable query means an empty user.
///
/// No locking here: the counter and gauge are atomic on their own.
pub async fn greet(State(state): State<AppState>, q: Option<Query<GreetQuery>>) -> String {
    let user = q.map(|Query(q)| q.user).unwrap_or_default();

    let m = state.metrics();
    m.num_calls.add(1);
    m.last_user.set(user.as_str());

    format!("G'day {user}\n")
}
