//! List query state: the inputs that decide what a list screen fetches.
//!
//! Every holder here is plain synchronous state. Any change to sort, search
//! or filters sends pagination back to the first page (see [`QueryState`]).

pub mod filter;
pub mod key;
pub mod pagination;
pub mod search;
pub mod sort;
pub mod state;

pub use filter::{FilterDraft, FilterMode, FilterPredicate, FilterSet, FilterValue};
pub use key::QueryKey;
pub use pagination::{DEFAULT_PAGE_SIZE, Pagination};
pub use search::SearchInput;
pub use sort::{SortDirection, SortSpec, SortState};
pub use state::QueryState;
