//! Cursor-paginated connections over ordered result sets

mod connection;
mod cursor;

pub use connection::{
    paginate, paginate_with, Connection, ConnectionArgs, ConnectionEdge, Cursored, PageInfo,
    PageLimits, PaginationError, PaginationResult,
};
pub use cursor::{decode_cursor, encode_cursor};
