use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Called after each revealed character with the character and the text so far
pub type CharacterObserver = Box<dyn FnMut(char, &str) + Send>;

#[derive(Debug, Clone, Copy)]
pub struct RevealTiming {
    pub base_delay: Duration,
    pub jitter: Duration, // uniform +/- around base_delay
    pub seed: Option<u64>,
}

impl RevealTiming {
    fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.jitter.is_zero() {
            return self.base_delay;
        }
        let base = self.base_delay.as_secs_f64();
        let jitter = self.jitter.as_secs_f64();
        let offset = rng.random_range(-jitter..=jitter);
        Duration::from_secs_f64((base + offset).max(0.0))
    }
}

/// A running reveal. Dropping it does not stop the reveal; call `cancel`.
pub struct RevealHandle {
    cancel: CancellationToken,
    task: JoinHandle<Option<String>>,
}

impl RevealHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The full text once every character is out, or `None` if cancelled first
    pub async fn finished(self) -> Option<String> {
        self.task.await.ok().flatten()
    }
}

/// Reveal `text` one character at a time on a jittered timer.
/// `parent` cancels this reveal along with everything else it owns.
pub fn reveal(
    text: String,
    timing: RevealTiming,
    mut on_character: CharacterObserver,
    parent: &CancellationToken,
) -> RevealHandle {
    let cancel = parent.child_token();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut rng = match timing.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut shown = String::with_capacity(text.len());

        for c in text.chars() {
            let delay = timing.next_delay(&mut rng);
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if token.is_cancelled() {
                return None;
            }
            shown.push(c);
            on_character(c, &shown);
        }

        Some(shown)
    });

    RevealHandle { cancel, task }
}
