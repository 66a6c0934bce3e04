use std::sync::Arc;

use futures_util::{TryStreamExt, stream};
use tracing::debug;

use super::store::{BoxStream, ObjectStore};
use crate::data::RemoteObject;
use crate::error::{Error, Result};

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazy listing of every object under a prefix, across however many pages
/// the store splits it into.
///
/// Only one page is held at a time. An error ends the stream after the
/// objects of earlier pages have been yielded; callers that need an
/// all-or-nothing listing should use [`collect`](Self::collect).
pub struct PaginatedLister<S> {
    store: Arc<S>,
}

impl<S> Clone for PaginatedLister<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ObjectStore> PaginatedLister<S> {
    pub fn new(store: Arc<S>) -> Self { Self { store } }

    /// Stream the objects under `prefix` in page order. Each call starts
    /// from the first page.
    pub fn list(&self, prefix: &str) -> BoxStream<'static, Result<RemoteObject>> {
        let state = (Arc::clone(&self.store), prefix.to_string(), Cursor::Start);
        let pages = stream::try_unfold(state, |(store, prefix, cursor)| async move {
            let Some((objects, next)) = next_page(&*store, &prefix, cursor).await? else {
                return Ok::<_, Error>(None);
            };
            let objects = stream::iter(objects.into_iter().map(Ok::<_, Error>));
            Ok(Some((objects, (store, prefix, next))))
        });
        Box::pin(pages.try_flatten())
    }

    /// Buffer the whole listing, failing if any page fails.
    pub async fn collect(&self, prefix: &str) -> Result<Vec<RemoteObject>> { self.list(prefix).try_collect().await }
}

async fn next_page<S: ObjectStore>(store: &S, prefix: &str, cursor: Cursor) -> Result<Option<(Vec<RemoteObject>, Cursor)>> {
    let token = match cursor {
        Cursor::Start => None,
        Cursor::Next(token) => Some(token),
        Cursor::Done => return Ok(None),
    };

    let page = store.list_page(prefix, token.as_deref()).await?;
    debug!(prefix, objects = page.objects.len(), more = page.next_token.is_some(), "listed page");

    let next = match page.next_token {
        Some(next) if token.as_deref() == Some(next.as_str()) => {
            return Err(Error::backend("list", format!("pagination cursor did not advance past {next:?}")));
        }
        Some(next) => Cursor::Next(next),
        None => Cursor::Done,
    };

    Ok(Some((page.objects, next)))
}
