mod default;
mod input;

pub use default::DefaultSource;
pub use input::InputSource;

pub(crate) const INPUT_SOURCE_TYPE: &str = "source-input";
pub(crate) const DEFAULT_SOURCE_TYPE: &str = "source-default";

/// Evaluator key of a built-in source name the dictionary does not need to
/// declare.
pub(crate) fn builtin_source_type(source_name: &str) -> Option<&'static str> {
  match source_name {
    "input" => Some(INPUT_SOURCE_TYPE),
    "default" => Some(DEFAULT_SOURCE_TYPE),
    _ => None,
  }
}
