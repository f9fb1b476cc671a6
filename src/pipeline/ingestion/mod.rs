pub mod batch_writer;
pub mod feed_client;

pub use batch_writer::BatchWriter;
pub use feed_client::{parse_feed, FeedClient};
