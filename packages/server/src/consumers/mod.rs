mod pipeline_result;

pub use pipeline_result::{consume_pipeline_results, process_pipeline_result};
