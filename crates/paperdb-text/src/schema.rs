use tantivy::schema::{
    IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "text_en_stop";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    let id_options = NumericOptions::default().set_indexed().set_stored();
    let _fragment_id = schema_builder.add_i64_field("fragment_id", id_options.clone());
    let _document_id = schema_builder.add_i64_field("document_id", id_options.clone());
    let _page_number = schema_builder.add_i64_field("page_number", id_options);

    let text_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default()
        .set_indexing_options(text_indexing)
        .set_stored();
    let _text = schema_builder.add_text_field("text", text_options);

    schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
    let stop_words = vec![
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it",
        "of", "on", "that", "the", "to", "was", "will", "with", "or", "but", "not", "this",
        "these", "they", "their", "there", "then", "than",
    ];
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
        .build();
    index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
