//! Export error type

/// Every way an export can be refused or aborted.
///
/// Selection and hierarchy errors are detected before anything is written.
/// [`ExportError::Evaluation`], [`ExportError::Io`] and
/// [`ExportError::StateRestoreMismatch`] can occur after the HIERARCHY block
/// has gone out, leaving a prefix of the document in the caller's writer;
/// buffer the output when a partial file must never appear. The scene is
/// restored on every path regardless.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The export target has no animation evaluator attached
    #[error("no animator on export target")]
    NoAnimator,

    /// The skeleton source does not describe a humanoid rig
    #[error("rig is not humanoid (no Hips mapping)")]
    NotHumanoid,

    /// The requested clip is not known to the evaluator
    #[error("no animation clip named '{0}'")]
    ClipNotFound(String),

    /// The clip reports a frame rate that cannot be sampled
    #[error("clip frame rate {0} is not a positive finite value")]
    InvalidFrameRate(f32),

    /// The chosen export root is outside the export target
    #[error("root transform '{root}' is not a descendant of '{target}'")]
    RootNotDescendant { root: String, target: String },

    /// No root was chosen and no `Armature` child exists
    #[error("no default root node: Armature")]
    MissingDefaultRoot,

    /// The traversal produced other than exactly one top-level joint
    #[error("expected exactly one top-level joint, found {0}")]
    AmbiguousRoot(usize),

    /// Joints that have neither child joints nor an `<name>_end` marker
    #[error("bones not terminated by '<name>_end': {}", .0.join(", "))]
    UnterminatedBranch(Vec<String>),

    /// An end site that would share its parent with other bones
    #[error("end site '{end_site}' must be the only child of '{parent}'")]
    MisplacedEndSite { end_site: String, parent: String },

    /// A humanoid role or node was mapped twice
    #[error("duplicate humanoid mapping for {0}")]
    DuplicateMapping(String),

    /// Saved and restored transform counts disagree (logic defect)
    #[error("transform restore mismatch: saved {saved} records, visited {visited} nodes")]
    StateRestoreMismatch { saved: usize, visited: usize },

    /// The animation evaluator failed to advance the pose
    #[error("animation evaluation failed: {0}")]
    Evaluation(String),

    /// Writing the output stream failed
    #[error("failed to write BVH output: {0}")]
    Io(#[from] std::io::Error),
}
