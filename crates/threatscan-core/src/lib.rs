pub mod config;
pub mod key;
pub mod labels;
pub mod parser;
pub mod verdict;
pub mod window;

pub use config::{ClassifierConfig, ConfigError, ModelConfig, ParserKind, StoreLayout, WindowConfig};
pub use key::{SourceIdError, cache_key, result_file_name, validate_source_id};
pub use labels::{LevelSummary, ThreatLevel};
pub use parser::{JsonParser, MarkerParser, ParseError, ParsedVerdict, VerdictParser, parser_for};
pub use verdict::{ClassifyReport, ResultSet, Verdict, VerdictStatus};
pub use window::{Windower, split_windows};
