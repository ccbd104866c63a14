//! Named, fixed-shape slots and the feeds that fill them.
//!
//! A builder declares its [`Placeholder`]s once, at construction. Every batch
//! it produces maps each placeholder key to an array of exactly that shape.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array, ArrayViewD, Dimension};

/// Name of a slot, without the agent it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotName {
    Features,
    NextFeatures,
    Hidden,
    NextHidden,
    Message,
    NextMessage,
    DescHidden,
    NextDescHidden,
    ActionValues,
    NextActionValues,
    Desc,
    NextDesc,
    Action,
    ActionIndex,
    Reward,
    Terminal,
    Mask,
    ObserverFeatures,
    TrueFeatures,
    DistractorFeatures,
}

impl SlotName {
    /// Short name used by the training graph.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Features => "x",
            SlotName::NextFeatures => "x_next",
            SlotName::Hidden => "h",
            SlotName::NextHidden => "h_next",
            SlotName::Message => "z",
            SlotName::NextMessage => "z_next",
            SlotName::DescHidden => "dh",
            SlotName::NextDescHidden => "dh_next",
            SlotName::ActionValues => "q",
            SlotName::NextActionValues => "q_next",
            SlotName::Desc => "desc",
            SlotName::NextDesc => "desc_next",
            SlotName::Action => "action",
            SlotName::ActionIndex => "action_index",
            SlotName::Reward => "reward",
            SlotName::Terminal => "terminal",
            SlotName::Mask => "mask",
            SlotName::ObserverFeatures => "xb",
            SlotName::TrueFeatures => "xa_true",
            SlotName::DistractorFeatures => "xa_noise",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one slot: a name, and the agent it belongs to if it is per-agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub name: SlotName,
    pub agent: Option<usize>,
}

impl SlotKey {
    /// A slot shared by all agents.
    pub fn shared(name: SlotName) -> Self {
        Self { name, agent: None }
    }

    pub fn agent(name: SlotName, agent: usize) -> Self {
        Self {
            name,
            agent: Some(agent),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.agent {
            Some(agent) => write!(f, "{}/{}", self.name, agent),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Element type of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    F32,
    I32,
}

/// Borrowed contents of one filled slot.
#[derive(Debug, Clone)]
pub enum SlotRef<'a> {
    F32(ArrayViewD<'a, f32>),
    I32(ArrayViewD<'a, i32>),
}

impl<'a> SlotRef<'a> {
    pub fn shape(&self) -> &[usize] {
        match self {
            SlotRef::F32(a) => a.shape(),
            SlotRef::I32(a) => a.shape(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            SlotRef::F32(_) => ElementKind::F32,
            SlotRef::I32(_) => ElementKind::I32,
        }
    }

    /// Returns the float contents, or `None` for an integer slot.
    pub fn as_f32(&self) -> Option<&ArrayViewD<'a, f32>> {
        match self {
            SlotRef::F32(a) => Some(a),
            SlotRef::I32(_) => None,
        }
    }

    /// Returns the integer contents, or `None` for a float slot.
    pub fn as_i32(&self) -> Option<&ArrayViewD<'a, i32>> {
        match self {
            SlotRef::I32(a) => Some(a),
            SlotRef::F32(_) => None,
        }
    }
}

impl<'a, D: Dimension> From<&'a Array<f32, D>> for SlotRef<'a> {
    fn from(a: &'a Array<f32, D>) -> Self {
        SlotRef::F32(a.view().into_dyn())
    }
}

impl<'a, D: Dimension> From<&'a Array<i32, D>> for SlotRef<'a> {
    fn from(a: &'a Array<i32, D>) -> Self {
        SlotRef::I32(a.view().into_dyn())
    }
}

/// A mapping from every slot of a batch to its contents.
pub type Feed<'a> = BTreeMap<SlotKey, SlotRef<'a>>;

/// A batch that can be handed to the training engine slot by slot.
pub trait FeedSlots {
    fn slots(&self) -> Feed<'_>;
}

/// Declared key, shape and element type of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub key: SlotKey,
    pub shape: Vec<usize>,
    pub kind: ElementKind,
}

impl Placeholder {
    /// Declares one placeholder per slot of `batch`, taking each shape as is.
    pub fn declare<B: FeedSlots>(batch: &B) -> Vec<Placeholder> {
        batch
            .slots()
            .into_iter()
            .map(|(key, value)| Placeholder {
                key,
                shape: value.shape().to_vec(),
                kind: value.kind(),
            })
            .collect()
    }

    /// True if `value` has this placeholder's shape and element type.
    pub fn accepts(&self, value: &SlotRef<'_>) -> bool {
        value.kind() == self.kind && value.shape() == self.shape.as_slice()
    }
}

/// True if `feed` fills exactly the slots in `placeholders`, each with a
/// matching shape.
pub fn feed_matches(placeholders: &[Placeholder], feed: &Feed<'_>) -> bool {
    placeholders.len() == feed.len()
        && placeholders
            .iter()
            .all(|p| feed.get(&p.key).is_some_and(|v| p.accepts(v)))
}
