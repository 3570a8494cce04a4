//! Slice stacks

use std::io::Write as IoWrite;

use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use crate::error::Result;
use crate::model::{Slice, SliceReference, SliceStack, SliceStackContent};

use super::{close, emit};

fn stack_start(stack: &SliceStack) -> BytesStart<'static> {
    let mut elem = BytesStart::new("s:slicestack");
    elem.push_attribute(("id", stack.id.to_string().as_str()));
    elem.push_attribute(("zbottom", stack.bottom_z.to_string().as_str()));
    elem
}

/// Write a slice stack as it appears in its own part
///
/// A stack flagged `uses_slice_ref` is written as a reference to
/// [`SliceStack::slice_ref_path`]; the package writer emits that part separately.
pub(super) fn write_slice_stack<W: IoWrite>(
    writer: &mut Writer<W>,
    part: &str,
    stack: &SliceStack,
) -> Result<()> {
    match &stack.content {
        SliceStackContent::Owned(_) if stack.uses_slice_ref => {
            let reference = SliceReference::new(stack.slice_ref_path(part), stack.id);
            write_referencing_stack(writer, stack, &reference)
        }
        SliceStackContent::Owned(_) => write_owned_slice_stack(writer, stack),
        SliceStackContent::Referenced(reference) => {
            write_referencing_stack(writer, stack, reference)
        }
    }
}

fn write_referencing_stack<W: IoWrite>(
    writer: &mut Writer<W>,
    stack: &SliceStack,
    reference: &SliceReference,
) -> Result<()> {
    emit(writer, Event::Start(stack_start(stack)), "slicestack")?;
    let mut elem = BytesStart::new("s:sliceref");
    elem.push_attribute(("slicestackid", reference.stack_id.to_string().as_str()));
    elem.push_attribute(("slicepath", reference.path.as_str()));
    emit(writer, Event::Empty(elem), "sliceref")?;
    close(writer, "s:slicestack")
}

/// Write a stack with its slices inline
pub(super) fn write_owned_slice_stack<W: IoWrite>(
    writer: &mut Writer<W>,
    stack: &SliceStack,
) -> Result<()> {
    let slices = stack.owned_slices().unwrap_or_default();
    if slices.is_empty() {
        return emit(writer, Event::Empty(stack_start(stack)), "slicestack");
    }
    emit(writer, Event::Start(stack_start(stack)), "slicestack")?;
    for slice in slices {
        write_slice(writer, slice)?;
    }
    close(writer, "s:slicestack")
}

fn write_slice<W: IoWrite>(writer: &mut Writer<W>, slice: &Slice) -> Result<()> {
    let mut elem = BytesStart::new("s:slice");
    elem.push_attribute(("ztop", slice.ztop.to_string().as_str()));
    if slice.vertices.is_empty() && slice.polygons.is_empty() {
        return emit(writer, Event::Empty(elem), "slice");
    }
    emit(writer, Event::Start(elem), "slice")?;

    emit(writer, Event::Start(BytesStart::new("s:vertices")), "vertices")?;
    for vertex in &slice.vertices {
        let mut elem = BytesStart::new("s:vertex");
        elem.push_attribute(("x", vertex.x.to_string().as_str()));
        elem.push_attribute(("y", vertex.y.to_string().as_str()));
        emit(writer, Event::Empty(elem), "vertex")?;
    }
    close(writer, "s:vertices")?;

    for polygon in &slice.polygons {
        let mut elem = BytesStart::new("s:polygon");
        elem.push_attribute(("startv", polygon.start.to_string().as_str()));
        emit(writer, Event::Start(elem), "polygon")?;
        for segment in &polygon.segments {
            let mut elem = BytesStart::new("s:segment");
            elem.push_attribute(("v2", segment.v2.to_string().as_str()));
            emit(writer, Event::Empty(elem), "segment")?;
        }
        close(writer, "s:polygon")?;
    }
    close(writer, "s:slice")
}
