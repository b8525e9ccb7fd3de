use combine::{
    any, attempt, eof, many, many1, optional, satisfy, skip_many, skip_many1, token, Parser,
    Stream,
};

pub trait ByteStream<'a>: Stream<Token = u8, Range = &'a [u8]> + 'a {}
impl<'a, T: Stream<Token = u8, Range = &'a [u8]> + 'a> ByteStream<'a> for T {}

/// One source line split into its label and the words after it.
#[derive(Debug, PartialEq)]
pub struct Row {
    /// Empty when the line starts with whitespace.
    pub label: String,
    pub words: Vec<String>,
}

impl Row {
    pub fn split(line: &str) -> anyhow::Result<Row> {
        let (row, _) = row()
            .parse(line.as_bytes())
            .map_err(|e| anyhow::anyhow!("malformed line: {e}"))?;
        Ok(row)
    }
}

fn is_word_byte(c: u8) -> bool {
    !c.is_ascii_whitespace() && c != b'#'
}

fn is_blank(c: u8) -> bool {
    c.is_ascii_whitespace()
}

fn text(v: Vec<u8>) -> String {
    String::from_utf8_lossy(&v).to_string()
}

fn word<'a, Input>() -> impl Parser<Input, Output = String> + 'a
where
    Input: ByteStream<'a>,
{
    many1::<Vec<_>, _, _>(satisfy(is_word_byte)).map(text)
}

fn row<'a, Input>() -> impl Parser<Input, Output = Row> + 'a
where
    Input: ByteStream<'a>,
{
    let label = many::<Vec<_>, _, _>(satisfy(is_word_byte)).map(text);
    let words = many::<Vec<_>, _, _>(attempt(skip_many1(satisfy(is_blank)).with(word())));
    let comment = optional(token(b'#').with(skip_many(any())));
    (label, words, skip_many(satisfy(is_blank)), comment, eof())
        .map(|(label, words, _, _, _)| Row { label, words })
}
