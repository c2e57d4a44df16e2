use std::io::{self, BufRead, Write};

/// Prompts until a number is entered. A blank line takes `default` when one
/// is given. Returns `None` at end of input.
pub fn get_input<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: Option<f64>,
) -> io::Result<Option<f64>> {
    loop {
        match default {
            Some(value) => write!(output, "{prompt} [{value}]: ")?,
            None => write!(output, "{prompt}: ")?,
        }
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let line = line.trim();
        if line.is_empty() {
            if let Some(value) = default {
                return Ok(Some(value));
            }
        }
        match line.parse::<f64>() {
            Ok(num) if num.is_finite() => return Ok(Some(num)),
            _ => writeln!(output, "Please enter a valid number")?,
        }
    }
}
