use crate::error::{ReadError, Result};

/// Number of text lines making up one FASTQ record
pub const LINES_PER_RECORD: usize = 4;

/// An owned FASTQ record
///
/// Fields hold the line contents without their markers or line breaks: `title`
/// excludes the leading `@` and `plus` excludes the leading `+`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastqRecord {
    pub title: String,
    pub sequence: String,
    pub plus: String,
    pub quality: String,
}
impl FastqRecord {
    pub fn new(
        title: impl Into<String>,
        sequence: impl Into<String>,
        plus: impl Into<String>,
        quality: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            sequence: sequence.into(),
            plus: plus.into(),
            quality: quality.into(),
        }
    }

    /// Size of the record as FASTQ text, including markers and line breaks
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.title.len() + self.sequence.len() + self.plus.len() + self.quality.len() + 6
    }

    /// Appends the record as four lines of FASTQ text
    pub fn write_text(&self, out: &mut Vec<u8>) {
        out.push(b'@');
        out.extend_from_slice(self.title.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(self.sequence.as_bytes());
        out.push(b'\n');
        out.push(b'+');
        out.extend_from_slice(self.plus.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(self.quality.as_bytes());
        out.push(b'\n');
    }

    /// Builds a record from four lines, each with or without its trailing line break
    ///
    /// # Errors
    ///
    /// * `ReadError::MalformedRecord` if the markers are missing or the sequence and
    ///   quality lengths differ
    pub fn from_lines(lines: &[String; LINES_PER_RECORD]) -> Result<Self> {
        let [title, sequence, plus, quality] = lines.each_ref().map(|l| strip_newline(l));

        let Some(title) = title.strip_prefix('@') else {
            return Err(ReadError::MalformedRecord(format!("title line without '@': {title}")).into());
        };
        let Some(plus) = plus.strip_prefix('+') else {
            return Err(ReadError::MalformedRecord(format!("separator line without '+': {plus}")).into());
        };
        if sequence.len() != quality.len() {
            return Err(ReadError::MalformedRecord(format!(
                "{title}: sequence length {} differs from quality length {}",
                sequence.len(),
                quality.len()
            ))
            .into());
        }
        Ok(Self::new(title, sequence, plus, quality))
    }
}

fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn lines(a: &str, b: &str, c: &str, d: &str) -> [String; 4] {
        [a.to_string(), b.to_string(), c.to_string(), d.to_string()]
    }

    #[test]
    fn test_write_text() {
        let record = FastqRecord::new("read1 len=4", "ACGT", "", "IIII");
        let mut out = Vec::new();
        record.write_text(&mut out);
        assert_eq!(out, b"@read1 len=4\nACGT\n+\nIIII\n");
        assert_eq!(record.byte_size(), out.len());
    }

    #[test]
    fn test_from_lines() {
        let record =
            FastqRecord::from_lines(&lines("@r1\n", "ACGT\n", "+r1\n", "FFFF\n")).unwrap();
        assert_eq!(record, FastqRecord::new("r1", "ACGT", "r1", "FFFF"));

        // The final line of a stream may lack its line break
        let record = FastqRecord::from_lines(&lines("@r2\n", "AC\n", "+\n", "##")).unwrap();
        assert_eq!(record.quality, "##");
    }

    #[test]
    fn test_from_lines_malformed() {
        let err = FastqRecord::from_lines(&lines("r1\n", "ACGT\n", "+\n", "FFFF\n")).unwrap_err();
        assert!(matches!(err, Error::ReadError(ReadError::MalformedRecord(_))));

        let err = FastqRecord::from_lines(&lines("@r1\n", "ACGT\n", "-\n", "FFFF\n")).unwrap_err();
        assert!(matches!(err, Error::ReadError(ReadError::MalformedRecord(_))));

        let err = FastqRecord::from_lines(&lines("@r1\n", "ACGT\n", "+\n", "FFF\n")).unwrap_err();
        assert!(matches!(err, Error::ReadError(ReadError::MalformedRecord(_))));
    }
}
