//! Cursor-paginated connections (Relay shape)

use super::cursor::{decode_cursor, encode_cursor};
use crate::graph::{Entity, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while slicing a result set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("`first` and `last` cannot be combined")]
    ConflictingBounds,
}

/// Result type for pagination
pub type PaginationResult<T> = Result<T, PaginationError>;

/// Items that can be addressed by a cursor
pub trait Cursored {
    /// Stable identity the cursor is derived from
    fn cursor_key(&self) -> &str;
}

impl Cursored for Node {
    fn cursor_key(&self) -> &str {
        self.id.as_str()
    }
}

impl Cursored for Entity {
    fn cursor_key(&self) -> &str {
        self.id().as_str()
    }
}

/// Pagination arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionArgs {
    pub first: Option<usize>,
    pub after: Option<String>,
    pub last: Option<usize>,
    pub before: Option<String>,
}

impl ConnectionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(mut self, n: usize) -> Self {
        self.first = Some(n);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn last(mut self, n: usize) -> Self {
        self.last = Some(n);
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }
}

/// Page size policy applied on top of the caller's arguments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageLimits {
    /// Used as `first` when neither `first` nor `last` is given
    pub default_page_size: Option<usize>,
    /// Upper bound for `first` / `last`
    pub max_page_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionEdge<T> {
    pub cursor: String,
    pub node: T,
}

/// One page of an ordered result set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<ConnectionEdge<T>>,
    pub page_info: PageInfo,
    /// Size of the full result set before slicing
    pub total_count: usize,
}

impl<T> Connection<T> {
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
            total_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }

    /// Transform every node, keeping cursors and page info
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Connection<U> {
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|e| ConnectionEdge {
                    cursor: e.cursor,
                    node: f(e.node),
                })
                .collect(),
            page_info: self.page_info,
            total_count: self.total_count,
        }
    }
}

/// Slice `items` according to `args` with no page-size policy
pub fn paginate<T: Cursored>(items: Vec<T>, args: &ConnectionArgs) -> PaginationResult<Connection<T>> {
    paginate_with(items, args, PageLimits::default())
}

/// Slice `items` according to `args`
///
/// The window is every item strictly after `after` and strictly before
/// `before`. `first` takes from the front of the window and `last` from the
/// back; giving both is an error. Page flags describe the full ordered set:
/// `has_previous_page` is true iff items precede the slice, `has_next_page`
/// iff items follow it.
pub fn paginate_with<T: Cursored>(
    items: Vec<T>,
    args: &ConnectionArgs,
    limits: PageLimits,
) -> PaginationResult<Connection<T>> {
    if args.first.is_some() && args.last.is_some() {
        return Err(PaginationError::ConflictingBounds);
    }

    let total = items.len();
    let position = |cursor: &str| -> PaginationResult<usize> {
        let key = decode_cursor(cursor)?;
        items
            .iter()
            .position(|item| item.cursor_key() == key)
            .ok_or_else(|| PaginationError::InvalidCursor(cursor.to_string()))
    };

    let start = match args.after {
        Some(ref cursor) => position(cursor)? + 1,
        None => 0,
    };
    let mut end = match args.before {
        Some(ref cursor) => position(cursor)?,
        None => total,
    };
    if end < start {
        end = start;
    }

    let clamp = |n: usize| limits.max_page_size.map_or(n, |max| n.min(max));
    let window = end - start;
    let (lo, hi) = match (args.first, args.last) {
        (Some(n), _) => (start, start + clamp(n).min(window)),
        (None, Some(n)) => (end - clamp(n).min(window), end),
        (None, None) => match limits.default_page_size {
            Some(n) => (start, start + clamp(n).min(window)),
            None => (start, end),
        },
    };

    let edges: Vec<ConnectionEdge<T>> = items
        .into_iter()
        .skip(lo)
        .take(hi - lo)
        .map(|node| ConnectionEdge {
            cursor: encode_cursor(node.cursor_key()),
            node,
        })
        .collect();

    let page_info = PageInfo {
        has_next_page: hi < total,
        has_previous_page: lo > 0,
        start_cursor: edges.first().map(|e| e.cursor.clone()),
        end_cursor: edges.last().map(|e| e.cursor.clone()),
    };

    Ok(Connection {
        edges,
        page_info,
        total_count: total,
    })
}
