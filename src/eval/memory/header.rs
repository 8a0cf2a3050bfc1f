//! Header for all heap objects
//!
//! Carries the link that threads every live object onto the heap's
//! tracking list and the bits a collector needs.

use bitmaps::Bitmap;

use super::object::ObjRef;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBits(Bitmap<1>);

const MARK_BIT: usize = 0;

impl HeaderBits {
    fn mark(&mut self) {
        self.0.set(MARK_BIT, true);
    }

    fn unmark(&mut self) {
        self.0.set(MARK_BIT, false);
    }

    fn is_marked(&self) -> bool {
        self.0.get(MARK_BIT)
    }
}

/// Object Header
///
/// `next` is the list head at the time the object was allocated
/// (adjusted when a neighbour is unlinked) so walking `next` from the
/// heap's head visits every live object, newest first.
#[derive(Default, Debug, Clone, Copy)]
pub struct ObjHeader {
    bits: HeaderBits,
    next: Option<ObjRef>,
}

impl ObjHeader {
    pub fn new(next: Option<ObjRef>) -> Self {
        ObjHeader {
            bits: HeaderBits::default(),
            next,
        }
    }

    pub fn next(&self) -> Option<ObjRef> {
        self.next
    }

    pub fn set_next(&mut self, next: Option<ObjRef>) {
        self.next = next;
    }

    pub fn mark(&mut self) {
        self.bits.mark()
    }

    pub fn unmark(&mut self) {
        self.bits.unmark()
    }

    pub fn is_marked(&self) -> bool {
        self.bits.is_marked()
    }
}
