use vellum_core::namespace::STATE_SLOT;
use vellum_core::{GlobalState, Result, VellumError};
use vellum_ledger::ArtifactBackend;

/// Owner of the live `GlobalState`.
///
/// The only way to change the state is [`StateStore::mutate`] (or a wholesale
/// [`StateStore::replace`] during restore): copy, apply, persist, swap. Callers
/// get clones, never the live value.
#[derive(Debug, Default)]
pub struct StateStore {
    live: Option<GlobalState>,
    generation: u64,
}

impl StateStore {
    /// A store with no state. Every read fails with `StateUninitialized`.
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// Load the persisted state slot, or synthesize the default state if the
    /// slot has never been written.
    pub fn load(backend: &dyn ArtifactBackend) -> Result<Self> {
        let live = match backend.read_slot(STATE_SLOT)? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| VellumError::serde(STATE_SLOT, e))?
            }
            None => {
                tracing::info!("no persisted state, starting from defaults");
                GlobalState::default()
            }
        };
        Ok(Self {
            live: Some(live),
            generation: 0,
        })
    }

    pub fn get_state(&self) -> Result<&GlobalState> {
        self.live.as_ref().ok_or(VellumError::StateUninitialized)
    }

    /// Bumped by every successful mutate or replace.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mutate<F>(&mut self, backend: &mut dyn ArtifactBackend, updater: F) -> Result<GlobalState>
    where
        F: FnOnce(&mut GlobalState),
    {
        let mut next = self.get_state()?.clone();
        updater(&mut next);
        self.install(backend, next)
    }

    /// Like [`StateStore::mutate`], but only if nothing changed since the
    /// caller observed `expected`.
    pub fn mutate_expecting<F>(
        &mut self,
        backend: &mut dyn ArtifactBackend,
        expected: u64,
        updater: F,
    ) -> Result<GlobalState>
    where
        F: FnOnce(&mut GlobalState),
    {
        if expected != self.generation {
            return Err(VellumError::StaleState {
                expected,
                actual: self.generation,
            });
        }
        self.mutate(backend, updater)
    }

    /// Swap in `state` wholesale and persist it.
    pub fn replace(&mut self, backend: &mut dyn ArtifactBackend, state: GlobalState) -> Result<()> {
        self.install(backend, state).map(|_| ())
    }

    fn install(&mut self, backend: &mut dyn ArtifactBackend, next: GlobalState) -> Result<GlobalState> {
        let bytes = serde_json::to_vec_pretty(&next).map_err(|e| VellumError::serde(STATE_SLOT, e))?;
        backend.write_slot(STATE_SLOT, &bytes)?;
        self.live = Some(next.clone());
        self.generation += 1;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::{ArtifactMeta, Goal};
    use vellum_ledger::MemoryBackend;

    #[test]
    fn uninitialized_store_refuses_reads_and_writes() {
        let mut backend = MemoryBackend::new();
        let mut store = StateStore::uninitialized();
        assert!(matches!(store.get_state(), Err(VellumError::StateUninitialized)));
        assert!(matches!(
            store.mutate(&mut backend, |s| s.total_cycles += 1),
            Err(VellumError::StateUninitialized)
        ));
        assert!(backend.read_slot(STATE_SLOT).unwrap().is_none());
    }

    #[test]
    fn load_defaults_when_slot_absent() {
        let backend = MemoryBackend::new();
        let store = StateStore::load(&backend).unwrap();
        assert_eq!(store.get_state().unwrap(), &GlobalState::default());
    }

    #[test]
    fn mutate_persists_whole_state() {
        let mut backend = MemoryBackend::new();
        let mut store = StateStore::load(&backend).unwrap();
        let returned = store
            .mutate(&mut backend, |s| {
                s.total_cycles = 3;
                s.current_goal = Some(Goal {
                    seed: "ship".into(),
                    ..Default::default()
                });
                s.artifact_metadata
                    .insert("/a.md".into(), ArtifactMeta::new("markdown", ""));
            })
            .unwrap();
        assert_eq!(returned.total_cycles, 3);
        assert_eq!(store.generation(), 1);

        let reloaded = StateStore::load(&backend).unwrap();
        assert_eq!(reloaded.get_state().unwrap(), &returned);
    }

    #[test]
    fn returned_copy_does_not_alias_live_state() {
        let mut backend = MemoryBackend::new();
        let mut store = StateStore::load(&backend).unwrap();
        let mut copy = store.mutate(&mut backend, |s| s.total_cycles = 1).unwrap();
        copy.total_cycles = 99;
        assert_eq!(store.get_state().unwrap().total_cycles, 1);
    }

    #[test]
    fn stale_generation_is_rejected() {
        let mut backend = MemoryBackend::new();
        let mut store = StateStore::load(&backend).unwrap();
        let seen = store.generation();
        store.mutate(&mut backend, |s| s.total_cycles += 1).unwrap();

        let err = store
            .mutate_expecting(&mut backend, seen, |s| s.total_cycles += 10)
            .unwrap_err();
        assert!(matches!(err, VellumError::StaleState { expected: 0, actual: 1 }));
        assert_eq!(store.get_state().unwrap().total_cycles, 1);

        store
            .mutate_expecting(&mut backend, 1, |s| s.total_cycles += 10)
            .unwrap();
        assert_eq!(store.get_state().unwrap().total_cycles, 11);
    }
}
