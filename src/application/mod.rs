pub mod use_cases;

pub use use_cases::dictionary_import::DictionaryImport;
pub use use_cases::import_pipeline::{ImportPipeline, ImportPipelineConfig};
pub use use_cases::range_dispatcher::RangeDispatcher;
