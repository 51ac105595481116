/// 请求引擎 - 把解析后的 API 规格变成一次 HTTP 调用并检查响应
mod evaluator;
mod executor;
mod extractor;
mod request;

pub use evaluator::{evaluate_assertion, evaluate_expectations, values_equal};
pub use executor::{dispatch, execute};
pub use extractor::extract_path;
pub use request::{
    PreparedRequest, assemble_body, build_query, prepare, stringify, substitute_path,
    unmatched_placeholders,
};
