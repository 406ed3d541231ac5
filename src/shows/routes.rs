use crate::error::Error;
use crate::shows::{ShowList, ShowSource};
use crate::web::web_error::WebError;
use axum::extract::{Path, State};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use tracing::warn;

#[derive(Clone)]
struct ShowState {
    shows: ShowList,
    source: ShowSource,
}

pub fn routes(router: Router, shows: ShowList, source: ShowSource) -> Router {
    router.merge(
        Router::new()
            .route("/shows", get(list))
            .route("/view/:date", get(view))
            .route("/show/:date", get(tracks))
            .with_state(ShowState { shows, source }),
    )
}

#[allow(clippy::unused_async)]
async fn list(State(state): State<ShowState>) -> Json<Vec<String>> {
    Json(state.shows.snapshot().to_vec())
}

#[allow(clippy::unused_async)]
async fn view(
    State(state): State<ShowState>,
    Path(date): Path<String>,
) -> Result<Html<String>, WebError> {
    let shows = state.shows.snapshot();
    let date = resolve(&shows, &date)?;
    let previous = previous_show(&shows, &date).unwrap_or_default();
    Ok(Html(render_show(&date, previous)))
}

async fn tracks(
    State(state): State<ShowState>,
    Path(date): Path<String>,
) -> Result<Html<String>, WebError> {
    let date = resolve(&state.shows.snapshot(), &date)?;
    let text = state.source.fetch_tracks(&date).await.map_err(|err| {
        warn!(date = %date, error = %err, "track list fetch failed");
        Error::ShowUnavailable(date.clone())
    })?;
    let lines: Vec<&str> = text.split(['\n', '\r']).filter(|l| !l.is_empty()).collect();
    Ok(Html(lines.join("<br>")))
}

/// Map `latest` to the newest show, and reject anything that isn't a `yy-mm-dd` date.
fn resolve(shows: &[String], date: &str) -> Result<String, Error> {
    let date = match (date, shows.last()) {
        ("latest", Some(last)) => last.as_str(),
        _ => date,
    };
    let parts: Vec<&str> = date.split('-').collect();
    let valid = parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    if valid {
        Ok(date.to_string())
    } else {
        Err(Error::InvalidShowDate(date.to_string()))
    }
}

/// The show aired before `date`.
fn previous_show<'a>(shows: &'a [String], date: &str) -> Option<&'a str> {
    let i = shows.iter().position(|s| s == date)?;
    i.checked_sub(1).map(|p| shows[p].as_str())
}

fn render_show(date: &str, previous: &str) -> String {
    format!(
        r#"
      <article>
        <iframe width="100%" height="120" frameborder="0"
          src="https://www.mixcloud.com/widget/iframe/?hide_cover=1&light=1&feed=/zifim1062fm/20{date}/"></iframe>
        <details>
          <summary>Track list</summary>
          <code>
            <div hx-get="/zifim/show/{date}" hx-trigger="revealed"></div>
          </code>
        </details>
      </article>
      <div hx-get="/zifim/view/{previous}" hx-swap="outerHTML">
        <a>Next show...</a>
      </div>
"#
    )
}
