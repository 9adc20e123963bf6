// Record Linkage Toolkit - Core Library
// Exposes all modules for use in the CLI and tests

pub mod table;
pub mod error;
pub mod normalize;      // Text Normalizer - casing and whitespace cleanup
pub mod similarity;     // N-gram TF-IDF similarity index
pub mod grouping;       // Union-find grouping over similarity pairs
pub mod deduplication;  // Exact dedupe / aggregation engine
pub mod fuzzy;          // Fuzzy dedupe pipeline
pub mod comparison;     // Cross-dataset comparator
pub mod address;        // Address & name parsing collaborators
pub mod email;          // Email validation & cleaning

// Re-export commonly used types
pub use table::{
    concat_tagged, load_csv, write_csv, Table, Value,
};
pub use error::LinkageError;
pub use normalize::{
    clean_spaces, clean_text, normalize_row, normalize_table, simplify_text,
    simplify_text_extended,
};
pub use similarity::{ngrams, NgramIndex, SimilarityEdge, DEFAULT_NGRAM_WINDOW};
pub use grouping::GroupAssignment;
pub use deduplication::{
    aggregate_column, assign_dedupe_ids, collapse_first, expand_columns, rank_rows,
    AggOp, AggregationDirective, Coercion, CustomAgg, DedupeEngine, DedupeOptions,
    GroupIds, BLANK_GROUP_ID, DEDUPE_COUNT_COLUMN, DEDUPE_ID_COLUMN, DEFAULT_RANK_COLUMN,
};
pub use fuzzy::{fuzzy_dedupe, fuzzy_group, prepare_target, FuzzyOptions, GROUP_COLUMN};
pub use comparison::{
    compare_tables, fuzzy_compare_tables, CompareOptions, FuzzyComparison, KeyPair,
    MATCH_COUNT_COLUMN, SOURCE_TAG_COLUMN,
};
pub use address::{
    parse_phone, split_name, split_zip, AddressOptions, AddressParser, AddressTagger,
    CountryTable, LabelMapping, NameOptions, ParsedAddress, ParsedName,
    StreetAbbreviations, TagError, ZipSplit,
};
pub use email::{
    email_domain, fix_con_to_com, is_gmail, keep_valid_email, loose_validate_email,
    validate_email,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
