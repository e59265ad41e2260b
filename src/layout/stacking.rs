//! Stacking-context management during layout
//!
//! Layout pushes an entry here for every block it opens, whether or not
//! the block creates a stacking context; the tag stack mirrors the block
//! stack exactly, so `pop` needs no arguments. When a block does create a
//! context, the new entry is inserted into the stacking-context tree at
//! the position that keeps the parent's children sorted by z-index,
//! *after* any existing children with the same z-index: paint order among
//! equal z is document order.
//!
//! # Parentable and non-parentable contexts
//!
//! A *parentable* context (relatively positioned boxes, the root) hosts
//! the contexts created while it is open. A *non-parentable* context
//! (inline-block, absolutely positioned) does not: contexts created
//! beneath it become its siblings instead. The manager realizes this by
//! only pushing parentable contexts onto the parent stack.
//!
//! # Debug bookkeeping
//!
//! Contexts created with [`StackingContextManager::push_without_block`]
//! are "incomplete" until [`StackingContextManager::set_block`] patches
//! their block. In debug builds an id set tracks them and
//! [`StackingContextManager::finish`] asserts it is empty; in release the
//! tracker is a zero-sized no-op.

use crate::error::LayoutError;
use crate::error::Result;
use crate::tree::box_tree::BlockRef;
use crate::tree::box_tree::IfcId;
use crate::tree::box_tree::StackingContextEntry;
use crate::tree::box_tree::StackingContextId;
use crate::tree::box_tree::StackingContextTree;

/// How a block participates in stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackingContextInfo {
  /// No stacking context
  None,
  /// A context that hosts descendants, with its used z-index
  Parentable(i32),
  /// A context whose would-be descendants become siblings
  NonParentable(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushKind {
  None,
  Parentable,
  NonParentable,
}

#[derive(Debug)]
struct OpenParent {
  tree_index: usize,
  /// Running subtree size; written back to the entry on pop
  skip: u16,
}

/// Tracks incomplete contexts; a debug capability with a release no-op.
trait IncompleteTracking: Default {
  fn insert(&mut self, id: StackingContextId);
  fn remove(&mut self, id: StackingContextId);
  fn assert_empty(&self);
}

#[cfg(debug_assertions)]
#[derive(Default)]
struct DebugIncompletes(rustc_hash::FxHashSet<u16>);

#[cfg(debug_assertions)]
impl IncompleteTracking for DebugIncompletes {
  fn insert(&mut self, id: StackingContextId) {
    self.0.insert(id.0);
  }

  fn remove(&mut self, id: StackingContextId) {
    self.0.remove(&id.0);
  }

  fn assert_empty(&self) {
    assert!(
      self.0.is_empty(),
      "stacking contexts without blocks: {:?}",
      self.0
    );
  }
}

#[cfg(not(debug_assertions))]
#[derive(Default)]
struct NoopIncompletes;

#[cfg(not(debug_assertions))]
impl IncompleteTracking for NoopIncompletes {
  fn insert(&mut self, _id: StackingContextId) {}
  fn remove(&mut self, _id: StackingContextId) {}
  fn assert_empty(&self) {}
}

#[cfg(debug_assertions)]
type Incompletes = DebugIncompletes;
#[cfg(not(debug_assertions))]
type Incompletes = NoopIncompletes;

/// Builds the stacking-context tree as layout walks the element tree.
#[derive(Default)]
pub struct StackingContextManager {
  tree: StackingContextTree,
  tag_stack: Vec<PushKind>,
  parent_stack: Vec<OpenParent>,
  /// Tree indices of all open contexts, parentable or not; IFCs attach
  /// to the innermost one. Entries shift when an insertion lands below
  /// them.
  attach_stack: Vec<usize>,
  next_id: u32,
  incompletes: Incompletes,
}

impl StackingContextManager {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers the push of a block. Returns the new context's id if
  /// `info` creates one.
  pub fn push(
    &mut self,
    info: StackingContextInfo,
    block: BlockRef,
  ) -> Result<Option<StackingContextId>> {
    self.push_inner(info, block, false)
  }

  /// Like [`push`](Self::push), but the owning block is not known yet;
  /// the caller must patch it later with [`set_block`](Self::set_block).
  pub fn push_without_block(
    &mut self,
    info: StackingContextInfo,
  ) -> Result<Option<StackingContextId>> {
    self.push_inner(info, BlockRef::default(), true)
  }

  fn push_inner(
    &mut self,
    info: StackingContextInfo,
    block: BlockRef,
    incomplete: bool,
  ) -> Result<Option<StackingContextId>> {
    let (z_index, parentable) = match info {
      StackingContextInfo::None => {
        self.tag_stack.push(PushKind::None);
        return Ok(None);
      }
      StackingContextInfo::Parentable(z) => (z, true),
      StackingContextInfo::NonParentable(z) => (z, false),
    };

    if self.next_id > u16::MAX as u32 {
      return Err(LayoutError::OutOfRefs);
    }
    let id = StackingContextId(self.next_id as u16);
    self.next_id += 1;

    let at = self.insertion_point(z_index);
    self.tree.insert(
      at,
      StackingContextEntry {
        skip: 1,
        id,
        z_index,
        block,
        ifcs: Vec::new(),
      },
    );
    if let Some(parent) = self.parent_stack.last_mut() {
      parent.skip += 1;
    }
    // An insertion below an open context shifts it rightward.
    for index in self.attach_stack.iter_mut() {
      if *index >= at {
        *index += 1;
      }
    }

    if parentable {
      self.parent_stack.push(OpenParent {
        tree_index: at,
        skip: 1,
      });
      self.tag_stack.push(PushKind::Parentable);
    } else {
      self.tag_stack.push(PushKind::NonParentable);
    }
    self.attach_stack.push(at);
    if incomplete {
      self.incompletes.insert(id);
    }
    Ok(Some(id))
  }

  /// Index at which a new child of the current parent keeps the child
  /// sequence non-decreasing in z-index, inserting after equal values.
  fn insertion_point(&self, z_index: i32) -> usize {
    let (mut cursor, end) = match self.parent_stack.last() {
      Some(parent) => (
        parent.tree_index + 1,
        parent.tree_index + parent.skip as usize,
      ),
      None => (0, self.tree.len()),
    };
    while cursor < end {
      let child = self.tree.entry(cursor);
      if child.z_index <= z_index {
        cursor += child.skip as usize;
      } else {
        break;
      }
    }
    cursor
  }

  /// Registers the pop of a block, closing its context if it opened one.
  pub fn pop(&mut self) {
    match self.tag_stack.pop().expect("stacking tag to pop") {
      PushKind::None => {}
      PushKind::NonParentable => {
        self.attach_stack.pop();
      }
      PushKind::Parentable => {
        let open = self.parent_stack.pop().expect("open parentable context");
        self.tree.entry_mut(open.tree_index).skip = open.skip;
        if let Some(parent) = self.parent_stack.last_mut() {
          // The entry itself was counted at insertion; fold in only its
          // descendants.
          parent.skip += open.skip - 1;
        }
        self.attach_stack.pop();
      }
    }
  }

  /// Patches the owning block of a context created without one.
  pub fn set_block(&mut self, id: StackingContextId, block: BlockRef) {
    let index = self
      .tree
      .index_of(id)
      .expect("stacking context id to patch");
    self.tree.entry_mut(index).block = block;
    self.incompletes.remove(id);
  }

  /// Attaches a finished inline formatting context to the innermost open
  /// context.
  pub fn add_ifc(&mut self, ifc: IfcId) {
    if let Some(&index) = self.attach_stack.last() {
      self.tree.entry_mut(index).ifcs.push(ifc);
    }
  }

  /// Finishes construction and returns the tree.
  ///
  /// All pushes must have been popped and every context must have a
  /// block.
  pub fn finish(self) -> StackingContextTree {
    assert!(self.tag_stack.is_empty(), "unbalanced stacking pushes");
    assert!(self.parent_stack.is_empty(), "unclosed stacking contexts");
    self.incompletes.assert_empty();
    self.tree
  }
}
