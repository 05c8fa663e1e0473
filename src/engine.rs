//! Chat session orchestration
//!
//! One `ChatEngine` owns a session's message log, conversation context and
//! composer. A send runs classify, analyze, a simulated network delay, compose
//! and the typing reveal, then appends the reply. Only one send runs at a time.

use crate::composer::ResponseComposer;
use crate::config::ChatConfig;
use crate::context::{analyze, reduce, ContextEvent, ConversationContext};
use crate::intent::classify;
use crate::logging;
use crate::metrics::TokenMetrics;
use crate::persona::{APOLOGY_MESSAGE, CANCELLED_MESSAGE};
use crate::session::{ChatMessage, PendingMessage, SessionStore};
use crate::typing::{self, CharacterObserver, RevealTiming};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    EmptyInput,
    Busy,
    Cancelled,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::EmptyInput => write!(f, "Message is empty"),
            SendError::Busy => write!(f, "Still answering the previous message"),
            SendError::Cancelled => write!(f, "{}", CANCELLED_MESSAGE),
        }
    }
}

impl std::error::Error for SendError {}

type SharedObserver = Arc<dyn Fn(char, &str) + Send + Sync>;

struct EngineState {
    store: SessionStore,
    context: ConversationContext,
    composer: ResponseComposer,
    delay_rng: StdRng,
}

pub struct ChatEngine {
    session_id: String,
    config: ChatConfig,
    state: Mutex<EngineState>,
    busy: AtomicBool,
    idle: Notify,
    alive: CancellationToken,
    metrics: watch::Receiver<TokenMetrics>,
    observer: Mutex<Option<SharedObserver>>,
}

/// Holds the busy flag; releasing it wakes queued senders
struct BusyGuard<'a> {
    engine: &'a ChatEngine,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.engine.busy.store(false, Ordering::Release);
        self.engine.idle.notify_waiters();
    }
}

impl ChatEngine {
    /// `alive` is the liveness guard: cancelling it stops every pending delay and reveal
    pub fn new(
        config: ChatConfig,
        store: SessionStore,
        metrics: watch::Receiver<TokenMetrics>,
        alive: CancellationToken,
    ) -> Self {
        let config = config.sanitized();
        let delay_rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };
        let state = EngineState {
            store,
            context: ConversationContext::default(),
            composer: ResponseComposer::new(&config),
            delay_rng,
        };

        let session_id = Uuid::new_v4().to_string();
        logging::log_session(Some(&session_id), "Chat engine started");

        Self {
            session_id,
            config,
            state: Mutex::new(state),
            busy: AtomicBool::new(false),
            idle: Notify::new(),
            alive,
            metrics,
            observer: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Register the per-character callback used by every later reveal
    pub fn set_character_observer<F>(&self, observer: F)
    where
        F: Fn(char, &str) + Send + Sync + 'static,
    {
        let mut slot = self.observer.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(observer));
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.alive.is_cancelled()
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.store.history().to_vec()
    }

    pub fn context(&self) -> ConversationContext {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.context.clone()
    }

    pub fn latest_metrics(&self) -> TokenMetrics {
        *self.metrics.borrow()
    }

    /// Fresh seed message and a fresh conversation context
    pub fn reset_chat(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.store.reset_chat();
        state.context = reduce(&state.context, &ContextEvent::Reset);
        logging::log_context(Some(&self.session_id), "Context reset");
    }

    /// Stop every pending delay and reveal; later sends fail with `Cancelled`
    pub fn dispose(&self) {
        if !self.alive.is_cancelled() {
            self.alive.cancel();
            logging::log_session(Some(&self.session_id), "Chat engine disposed");
        }
    }

    /// Send unless a previous reply is still in progress
    pub async fn try_send_message(&self, text: &str) -> Result<ChatMessage, SendError> {
        let input = text.trim();
        if input.is_empty() {
            return Err(SendError::EmptyInput);
        }
        let guard = self.try_acquire().ok_or(SendError::Busy)?;
        self.run(input, guard).await
    }

    /// Send, waiting for any reply in progress to finish first
    pub async fn send_message(&self, text: &str) -> Result<ChatMessage, SendError> {
        let input = text.trim();
        if input.is_empty() {
            return Err(SendError::EmptyInput);
        }
        let guard = self.acquire().await?;
        self.run(input, guard).await
    }

    fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { engine: self })
    }

    async fn acquire(&self) -> Result<BusyGuard<'_>, SendError> {
        loop {
            if self.alive.is_cancelled() {
                return Err(SendError::Cancelled);
            }
            if let Some(guard) = self.try_acquire() {
                return Ok(guard);
            }

            // Register before re-checking so a release in between is not missed
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(guard) = self.try_acquire() {
                return Ok(guard);
            }

            tokio::select! {
                biased;
                _ = self.alive.cancelled() => return Err(SendError::Cancelled),
                _ = &mut notified => {}
            }
        }
    }

    async fn run(&self, input: &str, _guard: BusyGuard<'_>) -> Result<ChatMessage, SendError> {
        let sid = Some(self.session_id.as_str());
        if self.alive.is_cancelled() {
            return Err(SendError::Cancelled);
        }

        let (intent, delay) = {
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let state = &mut *guard;
            state.store.add_message(PendingMessage::user(input));
            state.context = analyze(input, &state.context);
            let intent = classify(input);
            let delay = network_delay(&mut state.delay_rng, &self.config);
            (intent, delay)
        };
        logging::log_intent(sid, &format!("Classified {:?} as {}", truncate_for_log(input), intent.as_str()));

        tokio::select! {
            biased;
            _ = self.alive.cancelled() => {
                logging::log_session(sid, CANCELLED_MESSAGE);
                return Err(SendError::Cancelled);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let metrics = self.latest_metrics();
        let text = {
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let state = &mut *guard;
            match state.composer.compose(intent, input, &state.context, &metrics, Utc::now()) {
                Ok(composition) => {
                    state.context = reduce(&state.context, &composition.to_event());
                    composition.text
                }
                Err(e) => {
                    logging::log_error(sid, &format!("Compose failed, sending apology: {}", e));
                    APOLOGY_MESSAGE.to_string()
                }
            }
        };

        let handle = typing::reveal(text, self.reveal_timing(), self.character_observer(), &self.alive);
        let revealed = match handle.finished().await {
            Some(text) => text,
            None => {
                logging::log_session(sid, CANCELLED_MESSAGE);
                return Err(SendError::Cancelled);
            }
        };

        if self.alive.is_cancelled() {
            return Err(SendError::Cancelled);
        }

        let message = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.store.add_message(PendingMessage::assistant(revealed))
        };
        logging::log_session(sid, &format!("Reply appended ({} messages)", self.history().len()));
        Ok(message)
    }

    fn reveal_timing(&self) -> RevealTiming {
        RevealTiming {
            base_delay: self.config.typing_base_delay(),
            jitter: self.config.typing_jitter(),
            seed: self.config.rng_seed,
        }
    }

    fn character_observer(&self) -> CharacterObserver {
        let observer = self.observer.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match observer {
            Some(observer) => Box::new(move |c: char, shown: &str| observer(c, shown)),
            None => Box::new(|_: char, _: &str| {}),
        }
    }
}

fn network_delay(rng: &mut StdRng, config: &ChatConfig) -> Duration {
    let (min, max) = (config.network_delay_min_ms, config.network_delay_max_ms);
    let ms = if max > min { rng.random_range(min..=max) } else { min };
    Duration::from_millis(ms)
}

fn truncate_for_log(input: &str) -> String {
    input.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::SEED_MESSAGE;
    use crate::session::{MemorySlot, Role};

    fn fast_config() -> ChatConfig {
        ChatConfig {
            typing_base_delay_ms: 1,
            typing_jitter_ms: 0,
            network_delay_min_ms: 5,
            network_delay_max_ms: 10,
            rng_seed: Some(7),
            ..ChatConfig::default()
        }
    }

    fn engine_with(config: ChatConfig) -> (Arc<ChatEngine>, watch::Sender<TokenMetrics>) {
        let (tx, rx) = watch::channel(TokenMetrics::fallback());
        let store = SessionStore::load(Box::new(MemorySlot::default()), &config.session_key);
        let engine = ChatEngine::new(config, store, rx, CancellationToken::new());
        (Arc::new(engine), tx)
    }

    fn roles(engine: &ChatEngine) -> Vec<Role> {
        engine.history().iter().map(|m| m.role).collect()
    }

    async fn wait_until_busy(engine: &ChatEngine) {
        while !engine.is_busy() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_price_question_end_to_end() {
        let (engine, _tx) = engine_with(fast_config());
        let reply = engine.send_message("what's the price?").await.unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.contains("$0.000001"), "{}", reply.content);
        assert!(reply.content.contains("+5.20%"), "{}", reply.content);
        assert_eq!(roles(&engine), vec![Role::Assistant, Role::User, Role::Assistant]);
        assert!(engine.context().told_about_token);
    }

    #[tokio::test]
    async fn test_rapid_second_send_is_rejected() {
        let (engine, _tx) = engine_with(fast_config());

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.try_send_message("nft?").await }
        });
        wait_until_busy(&engine).await;

        assert_eq!(engine.try_send_message("price?").await.unwrap_err(), SendError::Busy);

        first.await.unwrap().unwrap();
        assert!(!engine.is_busy());
        engine.try_send_message("price?").await.unwrap();

        assert_eq!(
            roles(&engine),
            vec![Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        let history = engine.history();
        assert_eq!(history[1].content, "nft?");
        assert_eq!(history[3].content, "price?");
    }

    #[tokio::test]
    async fn test_queued_sends_alternate() {
        let (engine, _tx) = engine_with(fast_config());

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.send_message("roadmap?").await }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.send_message("team?").await }
        });

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(
            roles(&engine),
            vec![Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_dispose_cancels_in_flight_send() {
        let config = ChatConfig {
            network_delay_min_ms: 200,
            network_delay_max_ms: 200,
            ..fast_config()
        };
        let (engine, _tx) = engine_with(config);

        let pending = tokio::spawn({
            let engine = engine.clone();
            async move { engine.send_message("buy?").await }
        });
        wait_until_busy(&engine).await;
        engine.dispose();

        assert_eq!(pending.await.unwrap().unwrap_err(), SendError::Cancelled);
        // The user message landed, the reply never did
        assert_eq!(roles(&engine), vec![Role::Assistant, Role::User]);
        assert_eq!(engine.send_message("hello?").await.unwrap_err(), SendError::Cancelled);
        assert!(!engine.is_busy());
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let (engine, _tx) = engine_with(fast_config());

        assert_eq!(engine.send_message("   ").await.unwrap_err(), SendError::EmptyInput);
        assert_eq!(engine.try_send_message("").await.unwrap_err(), SendError::EmptyInput);
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_observer_sees_every_character() {
        let (engine, _tx) = engine_with(fast_config());
        let frames = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = frames.clone();
        engine.set_character_observer(move |_, shown| sink.lock().unwrap().push(shown.to_string()));

        let reply = engine.send_message("tell me a joke").await.unwrap();

        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), reply.content.chars().count());
        assert_eq!(frames.last(), Some(&reply.content));
    }

    #[tokio::test]
    async fn test_reply_uses_latest_metrics() {
        let (engine, tx) = engine_with(fast_config());
        tx.send(TokenMetrics {
            price: 0.000042,
            price_change_24h: -8.0,
            ..TokenMetrics::fallback()
        })
        .unwrap();

        let reply = engine.send_message("price").await.unwrap();
        assert!(reply.content.contains("$0.000042"), "{}", reply.content);
        assert!(reply.content.contains("-8.00%"), "{}", reply.content);
    }

    #[tokio::test]
    async fn test_invalid_metrics_produce_apology() {
        let (engine, tx) = engine_with(fast_config());
        tx.send(TokenMetrics {
            price: f64::NAN,
            ..TokenMetrics::fallback()
        })
        .unwrap();

        let reply = engine.send_message("price").await.unwrap();
        assert_eq!(reply.content, APOLOGY_MESSAGE);
    }

    #[tokio::test]
    async fn test_reset_clears_history_and_context() {
        let (engine, _tx) = engine_with(fast_config());
        engine.send_message("gm, nft?").await.unwrap();
        assert!(engine.context().greeted);

        engine.reset_chat();
        let history = engine.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Assistant);
        assert_eq!(history[0].content, SEED_MESSAGE);
        assert_eq!(engine.context(), ConversationContext::default());
    }
}
