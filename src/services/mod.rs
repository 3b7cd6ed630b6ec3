mod extractor;

pub use extractor::ExtractorClient;
