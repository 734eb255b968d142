use std::fmt::Display;

/// States every component passes through, strictly in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Constructed, deferred fields may still be empty
    Created,
    /// All deferred fields are injected
    Initialized,
    Resolved,
    Started,
    /// Terminal
    Stopped,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 5] = [
        LifecycleState::Created,
        LifecycleState::Initialized,
        LifecycleState::Resolved,
        LifecycleState::Started,
        LifecycleState::Stopped,
    ];

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|index| Self::ALL[index])
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Created => "CREATED",
            LifecycleState::Initialized => "INITIALIZED",
            LifecycleState::Resolved => "RESOLVED",
            LifecycleState::Started => "STARTED",
            LifecycleState::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// What happens to a callback whose parameters cannot all be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingArgumentPolicy {
    /// Abort the whole build
    #[default]
    FailBuild,
    /// Skip this one callback and continue
    SkipInvocation,
}
