//! Generic offset pagination over an in-memory slice (spec.md §4.5).
//!
//! Every `*/list` service calls [`paginate`] with its registry's snapshot
//! and the raw `cursor` string from the request; it gets back the page plus
//! the cursor to hand back as `nextCursor`, or an `McpError::InvalidParams`
//! if the client sent garbage.

use turbomcp_core::McpError;
use turbomcp_protocol::cursor::OffsetCursor;

/// Default page size used by every paginated list operation (spec.md §4.5
/// "Default page size 50").
pub const DEFAULT_PAGE_SIZE: usize = 50;

pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// Slice `items` starting at the offset encoded in `cursor` (or 0 if none),
/// returning at most `page_size` entries and a cursor for the rest.
pub fn paginate<T: Clone>(items: &[T], cursor: Option<&str>, page_size: usize) -> Result<Page<T>, McpError> {
    let offset = match cursor {
        Some(raw) => OffsetCursor::decode(raw)?.offset,
        None => 0,
    };

    if offset > items.len() {
        return Err(McpError::invalid_params("cursor offset past end of list"));
    }

    let end = (offset + page_size).min(items.len());
    let page = items[offset..end].to_vec();
    let next_cursor = if end < items.len() {
        Some(OffsetCursor::encode(end))
    } else {
        None
    };

    Ok(Page { items: page, next_cursor })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_with_more_to_come() {
        let items: Vec<u32> = (0..120).collect();
        let page = paginate(&items, None, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(page.items.len(), 50);
        assert_eq!(page.items[0], 0);
        assert!(page.next_cursor.is_some());
    }

    #[test]
    fn last_page_has_no_cursor() {
        let items: Vec<u32> = (0..10).collect();
        let page = paginate(&items, None, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(page.items.len(), 10);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn walks_the_whole_list_via_cursor_chain() {
        let items: Vec<u32> = (0..125).collect();
        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = paginate(&items, cursor.as_deref(), 50).unwrap();
            seen.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, items);
    }

    #[test]
    fn malformed_cursor_is_invalid_params() {
        let items = vec![1, 2, 3];
        let err = paginate(&items, Some("not-a-cursor"), DEFAULT_PAGE_SIZE).unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_INVALID_PARAMS);
    }
}
