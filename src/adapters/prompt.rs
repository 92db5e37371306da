use crate::domain::ports::Confirmer;
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// Asks on stdout and reads the answer line by line.
///
/// Accepts y/yes/n/no in any case and asks again on anything else.
/// End of input counts as "no".
pub struct LineConfirmer<R> {
    input: Mutex<R>,
}

pub type TerminalConfirmer = LineConfirmer<BufReader<Stdin>>;

impl TerminalConfirmer {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> LineConfirmer<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: Mutex::new(input),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Confirmer for LineConfirmer<R> {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        let mut input = self.input.lock().await;
        println!("\n{}", prompt);

        loop {
            let mut line = String::new();
            if input.read_line(&mut line).await? == 0 {
                return Ok(false);
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("Please answer yes or no. [y/n]"),
            }
        }
    }
}

/// `--yes`: confirms without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        tracing::info!("{}", prompt);
        tracing::info!("✅ Confirmed by --yes");
        Ok(true)
    }
}
