pub mod allele_frequency;
pub mod bed_parser;
pub mod errors;
pub mod find_column;
pub mod gwas_parser;
pub mod line_parser;
pub mod missing_values;
pub mod parse_marker;
pub mod plink_ld_parser;
pub mod read_table;
pub mod reformat_lines;
pub mod sniff_gwas_format;
pub mod transform_pvalue;

pub use bed_parser::{make_ucsc_bed_parser, BedLine, BedParser};
pub use errors::{ConfigurationError, IngestError, ParseError};
pub use gwas_parser::{make_gwas_parser, GwasParser, GwasParserConfig, GwasRecord};
pub use line_parser::LineParser;
pub use plink_ld_parser::{make_plink_ld_parser, LdLine, PlinkLdParser};
pub use sniff_gwas_format::guess_gwas;
