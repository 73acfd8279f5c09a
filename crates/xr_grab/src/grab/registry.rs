//! Transformer registry
//!
//! Owns every transformer of one interactable and keeps them in two
//! ordered [`RegistrationList`]s, one preferred for single-interactor grabs
//! and one for multi-interactor grabs.
//!
//! Registration changes made while a list is being processed are buffered:
//! removals hide the transformer from the rest of the cycle immediately,
//! additions are processed from the next cycle on. Reordering is only legal
//! between cycles.

use crate::error::{GrabError, GrabResult};
use crate::foundation::collections::{RegistrationList, SlotMap};
use crate::foundation::math::{Pose, Vec3};
use crate::foundation::time::UpdatePhase;
use crate::grab::transformer::{
    DropEventArgs,
    GrabTransformer,
    GrabView,
    TransformerCommand,
    TransformerCommands,
    TransformerKey,
    TransformerList,
};

/// Transformer storage plus the single and multiple registration lists
#[derive(Default)]
pub struct TransformerRegistry {
    storage: SlotMap<TransformerKey, Box<dyn GrabTransformer>>,
    single: RegistrationList<TransformerKey>,
    multiple: RegistrationList<TransformerKey>,
    processing: bool,
    grabbed: bool,
    pending_on_grab: Vec<TransformerKey>,
    added_when_grabbed: Vec<TransformerKey>,
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("stored", &self.storage.len())
            .field("single", &self.single.registered_items())
            .field("multiple", &self.multiple.registered_items())
            .field("processing", &self.processing)
            .field("grabbed", &self.grabbed)
            .finish()
    }
}

impl TransformerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, which: TransformerList) -> &RegistrationList<TransformerKey> {
        match which {
            TransformerList::Single => &self.single,
            TransformerList::Multiple => &self.multiple,
        }
    }

    fn list_mut(&mut self, which: TransformerList) -> &mut RegistrationList<TransformerKey> {
        match which {
            TransformerList::Single => &mut self.single,
            TransformerList::Multiple => &mut self.multiple,
        }
    }

    /// Store a transformer and register it at the end of `which`
    pub fn insert(&mut self, transformer: Box<dyn GrabTransformer>, which: TransformerList) -> TransformerKey {
        let key = self.storage.insert(transformer);
        self.link(key, which);
        key
    }

    /// Register an already stored transformer at the end of `which`.
    ///
    /// Returns `Ok(false)` when it is already registered there.
    pub fn add(&mut self, key: TransformerKey, which: TransformerList) -> GrabResult<bool> {
        if !self.storage.contains_key(key) {
            return Err(GrabError::UnknownTransformer(key));
        }
        if self.list(which).is_still_registered(key) {
            return Ok(false);
        }
        self.link(key, which);
        Ok(true)
    }

    fn link(&mut self, key: TransformerKey, which: TransformerList) {
        if !self.list_mut(which).register(key) {
            return;
        }
        if self.processing {
            log::debug!("Grab transformer {:?} added during processing, runs from the next cycle", key);
        }
        self.on_registered(key);
    }

    fn on_registered(&mut self, key: TransformerKey) {
        if let Some(transformer) = self.storage.get_mut(key) {
            transformer.on_link();
        }
        if self.grabbed && !self.pending_on_grab.contains(&key) {
            self.pending_on_grab.push(key);
        }
    }

    /// Unregister a transformer from `which`. Returns `false` when it was not registered there.
    pub fn remove(&mut self, key: TransformerKey, which: TransformerList) -> bool {
        if !self.list_mut(which).unregister(key) {
            return false;
        }
        if let Some(transformer) = self.storage.get_mut(key) {
            transformer.on_unlink();
        }
        true
    }

    /// Move a transformer to `index` in `which`, registering it when absent.
    ///
    /// Fails with [`GrabError::ProcessingInProgress`] while transformers are
    /// being processed.
    pub fn move_to(&mut self, key: TransformerKey, index: usize, which: TransformerList) -> GrabResult<()> {
        if self.processing {
            log::error!("Cannot move grab transformer {:?} while grab transformers are being processed", key);
            return Err(GrabError::ProcessingInProgress);
        }
        if !self.storage.contains_key(key) {
            return Err(GrabError::UnknownTransformer(key));
        }

        let list = self.list(which);
        let len = list.flushed_count() + usize::from(!list.is_still_registered(key));
        if index >= len {
            return Err(GrabError::IndexOutOfRange { index, len });
        }

        if self.list_mut(which).move_item_immediately(key, index) {
            self.on_registered(key);
        }
        Ok(())
    }

    /// Borrow a stored transformer
    pub fn get(&self, key: TransformerKey) -> Option<&dyn GrabTransformer> {
        self.storage.get(key).map(|transformer| transformer.as_ref())
    }

    /// Mutably borrow a stored transformer
    pub fn get_mut(&mut self, key: TransformerKey) -> Option<&mut (dyn GrabTransformer + 'static)> {
        self.storage.get_mut(key).map(|transformer| transformer.as_mut())
    }

    /// Whether the key resolves to a stored transformer
    pub fn contains(&self, key: TransformerKey) -> bool {
        self.storage.contains_key(key)
    }

    /// Whether the transformer is registered in `which`, pending changes included
    pub fn is_registered(&self, key: TransformerKey, which: TransformerList) -> bool {
        self.list(which).is_still_registered(key)
    }

    /// Registered keys of `which` in processing order, pending changes included
    pub fn registered(&self, which: TransformerList) -> Vec<TransformerKey> {
        self.list(which).registered_items()
    }

    /// Number of transformers registered in `which`, pending changes included
    pub fn count(&self, which: TransformerList) -> usize {
        self.list(which).flushed_count()
    }

    /// Whether transformers are being processed right now
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Apply buffered registrations and drop transformers no list references.
    pub fn flush(&mut self) {
        self.single.flush();
        self.multiple.flush();

        let (single, multiple) = (&self.single, &self.multiple);
        let before = self.storage.len();
        self.storage
            .retain(|key, _| single.is_still_registered(key) || multiple.is_still_registered(key));
        let dropped = before - self.storage.len();
        if dropped > 0 {
            log::trace!("Dropped {} unregistered grab transformers", dropped);
        }
    }

    pub(crate) fn set_grabbed(&mut self, grabbed: bool) {
        self.grabbed = grabbed;
        if !grabbed {
            self.pending_on_grab.clear();
            self.added_when_grabbed.clear();
        }
    }

    /// Deliver `on_grab` to every registered transformer
    pub(crate) fn notify_grab(&mut self, grab: &GrabView<'_>) {
        self.flush();
        self.pending_on_grab.clear();
        for key in self.all_registered() {
            if let Some(transformer) = self.storage.get_mut(key) {
                transformer.on_grab(grab);
            }
        }
    }

    /// Deliver the retroactive `on_grab` to transformers that joined an ongoing grab
    pub(crate) fn notify_late_joiners(&mut self, grab: &GrabView<'_>) {
        for key in std::mem::take(&mut self.pending_on_grab) {
            if !self.is_registered_anywhere(key) {
                continue;
            }
            if let Some(transformer) = self.storage.get_mut(key) {
                transformer.on_grab(grab);
            }
            if !self.added_when_grabbed.contains(&key) {
                self.added_when_grabbed.push(key);
            }
        }
    }

    /// Deliver `on_grab_count_changed` to every registered transformer
    pub(crate) fn notify_grab_count_changed(&mut self, grab: &GrabView<'_>, target_pose: &Pose, local_scale: &Vec3) {
        self.added_when_grabbed.clear();
        for key in self.all_registered() {
            if let Some(transformer) = self.storage.get_mut(key) {
                transformer.on_grab_count_changed(grab, target_pose, local_scale);
            }
        }
    }

    /// Deliver the queued `on_grab_count_changed` to late joiners only
    pub(crate) fn notify_added_grab_count_changed(
        &mut self,
        grab: &GrabView<'_>,
        target_pose: &Pose,
        local_scale: &Vec3,
    ) {
        for key in std::mem::take(&mut self.added_when_grabbed) {
            if !self.is_registered_anywhere(key) {
                continue;
            }
            if let Some(transformer) = self.storage.get_mut(key) {
                transformer.on_grab_count_changed(grab, target_pose, local_scale);
            }
        }
    }

    /// Deliver `on_drop` to every registered drop transformer
    pub(crate) fn notify_drop(&mut self, args: &DropEventArgs) {
        for key in self.all_registered() {
            if let Some(drop_transformer) = self
                .storage
                .get_mut(key)
                .and_then(|transformer| transformer.as_drop_transformer())
            {
                drop_transformer.on_drop(args);
            }
        }
    }

    fn is_registered_anywhere(&self, key: TransformerKey) -> bool {
        self.single.is_still_registered(key) || self.multiple.is_still_registered(key)
    }

    fn all_registered(&self) -> Vec<TransformerKey> {
        let mut keys = self.single.registered_items();
        for key in self.multiple.registered_items() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    fn can_any_process(&self, which: TransformerList) -> bool {
        self.list(which).registered_snapshot().iter().any(|&key| {
            self.list(which).is_still_registered(key)
                && self.storage.get(key).is_some_and(|transformer| transformer.can_process())
        })
    }

    /// Run the grab transformers for one cycle. Returns whether any processed.
    ///
    /// The multiple list goes first when several interactors grab or when no
    /// single transformer can process; the single list only runs when no
    /// multiple transformer processed.
    pub fn process_grab(
        &mut self,
        grab: &GrabView<'_>,
        phase: UpdatePhase,
        target_pose: &mut Pose,
        local_scale: &mut Vec3,
    ) -> bool {
        self.flush();

        let mut processed = false;
        if grab.grab_count() > 1 || !self.can_any_process(TransformerList::Single) {
            processed = self.process_list(TransformerList::Multiple, grab, phase, target_pose, local_scale, false);
        }
        if !processed {
            processed = self.process_list(TransformerList::Single, grab, phase, target_pose, local_scale, false);
        }
        processed
    }

    /// Run every drop-capable transformer while the object is not held.
    pub fn process_drop(
        &mut self,
        grab: &GrabView<'_>,
        phase: UpdatePhase,
        target_pose: &mut Pose,
        local_scale: &mut Vec3,
    ) -> bool {
        self.flush();

        let single = self.process_list(TransformerList::Single, grab, phase, target_pose, local_scale, true);
        let multiple = self.process_list(TransformerList::Multiple, grab, phase, target_pose, local_scale, true);
        single || multiple
    }

    fn process_list(
        &mut self,
        which: TransformerList,
        grab: &GrabView<'_>,
        phase: UpdatePhase,
        target_pose: &mut Pose,
        local_scale: &mut Vec3,
        dropped: bool,
    ) -> bool {
        let mut processed = false;
        self.processing = true;

        // The snapshot does not change until the next flush
        let count = self.list(which).registered_snapshot().len();
        for index in 0..count {
            let key = self.list(which).registered_snapshot()[index];
            if !self.list(which).is_still_registered(key) {
                continue;
            }
            let Some(transformer) = self.storage.get_mut(key) else {
                continue;
            };
            if !transformer.can_process() {
                continue;
            }
            if dropped {
                let can_process_on_drop = transformer
                    .as_drop_transformer()
                    .is_some_and(|drop_transformer| drop_transformer.can_process_on_drop());
                if !can_process_on_drop {
                    continue;
                }
            }

            let mut commands = TransformerCommands::new(key);
            transformer.process(grab, phase, target_pose, local_scale, &mut commands);
            processed = true;
            self.apply_commands(&mut commands);
        }

        self.processing = false;
        processed
    }

    /// Apply edits a callback queued.
    pub(crate) fn apply_commands(&mut self, commands: &mut TransformerCommands) {
        for command in commands.drain() {
            match command {
                TransformerCommand::Add(transformer, which) => {
                    self.insert(transformer, which);
                }
                TransformerCommand::Register(key, which) => {
                    if let Err(error) = self.add(key, which) {
                        log::warn!("Deferred grab transformer registration failed: {}", error);
                    }
                }
                TransformerCommand::Remove(key, which) => {
                    self.remove(key, which);
                }
            }
        }
    }
}
