//! Interactive prompts on stdin

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::prelude::*;

/// Buffered stdin for the prompt helpers.
pub fn stdin() -> tokio::io::BufReader<tokio::io::Stdin> {
    tokio::io::BufReader::new(tokio::io::stdin())
}

/// Print `message` and read one trimmed line. End of input cancels.
pub async fn prompt_line<R>(reader: &mut R, message: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    anstream::eprint!("{message}");

    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|e| eyre!("Failed to read input: {e}"))?;

    if read == 0 {
        return Err(Error::Cancelled.into());
    }

    Ok(line.trim().to_string())
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Ask a yes/no question. Anything but "y" or "yes" is a no.
pub async fn confirm<R>(reader: &mut R, message: &str) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    let answer = prompt_line(reader, &f!("{message} (y/n): ")).await?;
    Ok(is_yes(&answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prompt_line_reads_successive_lines() {
        let mut input: &[u8] = b" 1, 3 \ny\n";

        let first = prompt_line(&mut input, "Select: ").await.expect("line");
        let second = confirm(&mut input, "Proceed?").await.expect("answer");

        assert_eq!(first, "1, 3");
        assert!(second);
    }

    #[tokio::test]
    async fn test_prompt_line_eof_cancels() {
        let mut input: &[u8] = b"";

        let err = prompt_line(&mut input, "Select: ").await.unwrap_err();

        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Cancelled)));
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("Y"));
        assert!(is_yes("yes"));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
        assert!(!is_yes("yep"));
    }
}
