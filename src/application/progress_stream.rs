use futures::{stream::BoxStream, StreamExt};
use url::Url;

use super::controller::StreamEvent;
use crate::{api::ApiClient, domain::AppError};

/// Opens the progress stream at `url` and reports everything it produces,
/// finishing with [`StreamEvent::Ended`] if the server closes it cleanly.
pub fn progress_events(api_client: ApiClient, url: Url) -> BoxStream<'static, StreamEvent> {
    futures::stream::once(async move { api_client.open_progress_stream(url).await })
        .flat_map(|opened| match opened {
            Ok(events) => events
                .map(|item| match item {
                    Ok(raw) => StreamEvent::Data(raw),
                    Err(e) => StreamEvent::Failed(AppError::Transport(e.to_string())),
                })
                .chain(futures::stream::once(async { StreamEvent::Ended }))
                .boxed(),
            Err(e) => futures::stream::once(async move { StreamEvent::Rejected(e.into()) }).boxed(),
        })
        .boxed()
}
