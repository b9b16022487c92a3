//! Double-buffered intermediate targets
//!
//! A chain reads the input texture on its first pass and then alternates
//! between two intermediate textures, so any number of passes runs without
//! allocating per pass. The alternation is a three-state cursor with a pure
//! transition function; [`PingPong`] applies it to concrete slots and
//! [`TextureSlots`] decides when the slots have to be recreated.

/// Which intermediate texture the last pass wrote to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// No pass has run since the slots were (re)loaded
    #[default]
    Unset,
    UsingA,
    UsingB,
}

/// One of the three textures owned by a [`PingPong`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Input,
    A,
    B,
}

impl Cursor {
    /// Advances the cursor by one pass
    ///
    /// # Returns
    /// `(next cursor, source slot, target slot)`
    pub fn advance(self) -> (Cursor, Slot, Slot) {
        match self {
            Cursor::Unset => (Cursor::UsingA, Slot::Input, Slot::A),
            Cursor::UsingA => (Cursor::UsingB, Slot::A, Slot::B),
            Cursor::UsingB => (Cursor::UsingA, Slot::B, Slot::A),
        }
    }
}

/// Source and target of one pass
#[derive(Debug)]
pub struct PingPongPair<'a, T> {
    pub source: &'a T,
    pub target: &'a T,
}

/// Input texture plus two alternating intermediates
#[derive(Debug)]
pub struct PingPong<T> {
    input: T,
    a: T,
    b: T,
    cursor: Cursor,
}

impl<T> PingPong<T> {
    pub fn new(input: T, a: T, b: T) -> Self {
        Self {
            input,
            a,
            b,
            cursor: Cursor::Unset,
        }
    }

    pub fn slot(&self, slot: Slot) -> &T {
        match slot {
            Slot::Input => &self.input,
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Returns the next source/target pair and advances the cursor
    pub fn next(&mut self) -> PingPongPair<'_, T> {
        let (cursor, source, target) = self.cursor.advance();
        self.cursor = cursor;
        PingPongPair {
            source: self.slot(source),
            target: self.slot(target),
        }
    }

    /// Starts the next chain from the input texture again
    pub fn reset(&mut self) {
        self.cursor = Cursor::Unset;
    }
}

/// Ping-pong slots tagged with the cache key and size they were created for
#[derive(Debug)]
pub struct TextureSlots<T> {
    key: Option<String>,
    size: (u32, u32),
    slots: Option<PingPong<T>>,
}

impl<T> Default for TextureSlots<T> {
    fn default() -> Self {
        Self {
            key: None,
            size: (0, 0),
            slots: None,
        }
    }
}

impl<T> TextureSlots<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares the slots for a render of an image with the given key and size
    ///
    /// The slots are recreated with `create` when no key is given, when the key
    /// differs from the loaded one, or when the size changed. The cursor is
    /// reset either way.
    ///
    /// # Arguments
    /// * `key` - Identity of the image content, `None` forces a reload
    /// * `size` - Image size in pixels
    /// * `create` - Creates fresh slots for `size`
    ///
    /// # Returns
    /// `true` if the slots were recreated
    pub fn load(&mut self, key: Option<&str>, size: (u32, u32), create: impl FnOnce((u32, u32)) -> PingPong<T>) -> bool {
        let reusable = self.slots.is_some() && key.is_some() && self.key.as_deref() == key && self.size == size;

        if reusable {
            if let Some(slots) = &mut self.slots {
                slots.reset();
            }
            return false;
        }

        tracing::debug!(?key, width = size.0, height = size.1, "allocating ping-pong textures");
        self.slots = Some(create(size));
        self.key = key.map(str::to_string);
        self.size = size;
        true
    }

    pub fn get(&self) -> Option<&PingPong<T>> {
        self.slots.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut PingPong<T>> {
        self.slots.as_mut()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_transitions() {
        assert_eq!(Cursor::Unset.advance(), (Cursor::UsingA, Slot::Input, Slot::A));
        assert_eq!(Cursor::UsingA.advance(), (Cursor::UsingB, Slot::A, Slot::B));
        assert_eq!(Cursor::UsingB.advance(), (Cursor::UsingA, Slot::B, Slot::A));
    }

    #[test]
    fn test_pairs_chain_from_input() {
        let mut ping_pong = PingPong::new("input", "a", "b");

        // n filters plus the final copy
        for n in 0..6 {
            ping_pong.reset();
            let pairs: Vec<(&str, &str)> = (0..=n)
                .map(|_| {
                    let pair = ping_pong.next();
                    (*pair.source, *pair.target)
                })
                .collect();

            assert_eq!(pairs.len(), n + 1);
            assert_eq!(pairs[0].0, "input");
            for window in pairs.windows(2) {
                assert_eq!(window[1].0, window[0].1);
            }
            for (source, target) in &pairs {
                assert_ne!(source, target);
                assert_ne!(*target, "input");
            }
        }
    }

    #[test]
    fn test_load_reuses_slots_for_same_key_and_size() {
        let mut slots = TextureSlots::new();
        let mut created = 0;
        let mut create = |_size: (u32, u32)| {
            created += 1;
            PingPong::new(created, created * 10, created * 100)
        };

        assert!(slots.load(Some("photo"), (4, 4), &mut create));
        slots.get_mut().unwrap().next();
        assert_eq!(slots.get().unwrap().cursor(), Cursor::UsingA);

        assert!(!slots.load(Some("photo"), (4, 4), &mut create));
        assert_eq!(slots.get().unwrap().cursor(), Cursor::Unset);
        assert_eq!(*slots.get().unwrap().slot(Slot::Input), 1);

        assert!(slots.load(Some("other"), (4, 4), &mut create));
        assert!(slots.load(Some("other"), (8, 4), &mut create));
        assert!(slots.load(None, (8, 4), &mut create));
        assert!(slots.load(None, (8, 4), &mut create));
        assert_eq!(created, 5);
        assert_eq!(slots.key(), None);
        assert_eq!(slots.size(), (8, 4));
    }
}
