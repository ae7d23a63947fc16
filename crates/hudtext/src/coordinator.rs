//! Per-recipient wiring of compiler, scheduler and transport.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hudtext_markup::{CompiledText, Compiler};
use hudtext_schedule::{Priority, Scheduler, SchedulerState};

use crate::config::HudConfig;
use crate::error::HudError;
use crate::transport::Transport;

/// A recipient's scheduler and the text it will send next.
struct Display {
    scheduler: Scheduler,
    latest: Arc<Mutex<Option<String>>>,
}

/// Keeps each recipient's display up to date without exceeding its rate limit.
///
/// [`show`](Coordinator::show) compiles new content immediately and asks that
/// recipient's scheduler to deliver it. Bursts of `show` calls collapse into a
/// single delivery of the most recent content.
pub struct Coordinator<K> {
    compiler: Compiler,
    config: HudConfig,
    transport: Arc<dyn Transport<K>>,
    displays: Mutex<HashMap<K, Display>>,
}

impl<K> Coordinator<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    pub fn new(config: HudConfig, transport: impl Transport<K> + 'static) -> Self {
        Self {
            compiler: Compiler::new(config.layout),
            config,
            transport: Arc::new(transport),
            displays: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the compiler, e.g. to add custom tags.
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn config(&self) -> &HudConfig {
        &self.config
    }

    /// Compiles `content` for `recipient` and schedules its delivery `delay`
    /// from now.
    ///
    /// The returned [`CompiledText`] lets the caller react to overflow.
    pub fn show(
        &self,
        recipient: &K,
        content: &str,
        priority: Priority,
        delay: Duration,
    ) -> Result<CompiledText, HudError> {
        let compiled = self.compiler.compile(content);
        if compiled.overflowed {
            log::debug!("content for {recipient:?} overflows the display");
        }

        let mut displays = self.displays();
        let display = match displays.entry(recipient.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.open(recipient)?),
        };

        *lock(&display.latest) = Some(compiled.text.clone());
        display.scheduler.schedule_flush(delay, priority);
        Ok(compiled)
    }

    /// Reports that something outside this coordinator just put content on
    /// `recipient`'s display, visible for `shown_for`.
    ///
    /// That write counts against the recipient's rate limit, and our own
    /// content is repainted once the foreign content expires, but no later
    /// than the hook's `max_delay`. Returns `false` for unknown recipients.
    pub fn external_display(&self, recipient: &K, shown_for: Duration) -> bool {
        let displays = self.displays();
        let Some(display) = displays.get(recipient) else {
            return false;
        };

        display.scheduler.delay(self.config.schedule.min_interval());
        display.scheduler.schedule_flush(
            shown_for.min(self.config.hook.max_delay()),
            self.config.hook.priority(),
        );
        log::debug!("external content on {recipient:?} for {shown_for:?}");
        true
    }

    /// Delivers the latest content as soon as the rate limit allows.
    pub fn flush_now(&self, recipient: &K) -> bool {
        self.with_scheduler(recipient, |s| s.flush_now())
    }

    pub fn pause(&self, recipient: &K) -> bool {
        self.with_scheduler(recipient, |s| s.pause())
    }

    pub fn resume(&self, recipient: &K) -> bool {
        self.with_scheduler(recipient, |s| s.resume())
    }

    pub fn cancel(&self, recipient: &K) -> bool {
        self.with_scheduler(recipient, |s| s.cancel())
    }

    /// The scheduler state for `recipient`, if it has ever been shown anything.
    pub fn state(&self, recipient: &K) -> Option<SchedulerState> {
        self.displays().get(recipient).map(|d| d.scheduler.state())
    }

    /// Forgets `recipient`, discarding any pending delivery.
    pub fn remove(&self, recipient: &K) -> bool {
        let removed = self.displays().remove(recipient);
        // Dropped outside the map lock: this joins the worker thread.
        removed.is_some()
    }

    /// Number of recipients with a live scheduler.
    pub fn len(&self) -> usize {
        self.displays().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn open(&self, recipient: &K) -> Result<Display, HudError> {
        let scheduler = Scheduler::new(self.config.schedule.clone())?;
        let latest: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let transport = Arc::clone(&self.transport);
        let key = recipient.clone();
        let pending = Arc::clone(&latest);
        scheduler.on_flush(move |_| {
            let text = lock(&pending).clone();
            match text {
                Some(text) => transport.send(&key, &text),
                None => log::debug!("nothing to deliver to {key:?}"),
            }
        });

        log::debug!("opened display for {recipient:?}");
        Ok(Display { scheduler, latest })
    }

    fn with_scheduler(&self, recipient: &K, f: impl FnOnce(&Scheduler)) -> bool {
        match self.displays().get(recipient) {
            Some(display) => {
                f(&display.scheduler);
                true
            }
            None => false,
        }
    }

    fn displays(&self) -> MutexGuard<'_, HashMap<K, Display>> {
        lock(&self.displays)
    }
}

impl<K> std::fmt::Debug for Coordinator<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("compiler", &self.compiler)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn coordinator() -> (Coordinator<u32>, MemoryTransport<u32>) {
        let transport = MemoryTransport::new();
        (
            Coordinator::new(HudConfig::default(), transport.clone()),
            transport,
        )
    }

    #[test]
    fn test_show_compiles_and_opens_display() {
        let (coordinator, _) = coordinator();
        assert!(coordinator.is_empty());

        let compiled = coordinator
            .show(&7, "<allcaps>hi", Priority::NORMAL, Duration::from_secs(60))
            .unwrap();

        assert_eq!(compiled.text, "<allcaps>hi</allcaps>");
        assert_eq!(coordinator.len(), 1);
        assert_eq!(coordinator.state(&7), Some(SchedulerState::Pending));
        assert_eq!(coordinator.state(&8), None);
    }

    #[test]
    fn test_unknown_recipient_is_ignored() {
        let (coordinator, transport) = coordinator();
        assert!(!coordinator.external_display(&1, Duration::from_secs(1)));
        assert!(!coordinator.flush_now(&1));
        assert!(!coordinator.pause(&1));
        assert!(!coordinator.resume(&1));
        assert!(!coordinator.cancel(&1));
        assert!(!coordinator.remove(&1));
        assert!(transport.is_empty());
    }

    #[test]
    fn test_controls_reach_scheduler() {
        let (coordinator, _) = coordinator();
        coordinator
            .show(&1, "x", Priority::NORMAL, Duration::from_secs(60))
            .unwrap();

        assert!(coordinator.pause(&1));
        assert_eq!(coordinator.state(&1), Some(SchedulerState::Paused));
        assert!(coordinator.resume(&1));
        assert_eq!(coordinator.state(&1), Some(SchedulerState::Pending));
        assert!(coordinator.cancel(&1));
        assert_eq!(coordinator.state(&1), Some(SchedulerState::Idle));

        assert!(coordinator.remove(&1));
        assert!(coordinator.is_empty());
    }
}
