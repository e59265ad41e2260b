//! End-to-end layout scenarios
//!
//! Each test builds an element tree by hand, attaches declarations, runs
//! layout against a fixed viewport and a monospace font, and checks the
//! resulting box tree: block geometry, stacking-context order, and
//! inline content.

use boxflow::css::stylesheet::parse_inline_declarations;
use boxflow::css::stylesheet::CascadeOrigin;
use boxflow::dom::ElementRef;
use boxflow::dom::ElementTree;
use boxflow::dom::ElementTreeBuilder;
use boxflow::geometry::px;
use boxflow::geometry::Point;
use boxflow::geometry::Size;
use boxflow::images::Images;
use boxflow::layout::do_layout;
use boxflow::text::MonospaceFont;
use boxflow::tree::box_tree::BlockIndex;
use boxflow::tree::box_tree::InlineItem;
use boxflow::tree::box_tree::SubtreeId;
use boxflow::BoxTree;

const FONT: MonospaceFont = MonospaceFont::new(px(8), px(12), px(4));
const VIEWPORT: Size = Size::new(px(400), px(400));

fn layout(elements: &ElementTree, root: ElementRef) -> BoxTree {
  do_layout(elements, root, &FONT, &Images::new(), VIEWPORT).expect("layout succeeds")
}

fn attach(elements: &mut ElementTree, element: ElementRef, css: &str) {
  elements.add_declarations(element, CascadeOrigin::Author, parse_inline_declarations(css));
}

/// Checks `skip[i] = 1 + sum(skip[children(i)])` for every block.
fn assert_skip_invariant(tree: &BoxTree) {
  for subtree_index in 0..tree.subtree_count() {
    let subtree = tree.subtree(SubtreeId(subtree_index as u8));
    for index in 0..subtree.len() {
      let block = BlockIndex(index);
      let children_sum: u16 = subtree.children(block).map(|child| subtree.skip(child)).sum();
      assert_eq!(
        subtree.skip(block),
        1 + children_sum,
        "skip invariant at subtree {subtree_index} block {index}"
      );
    }
  }
}

#[test]
fn minimal_block_document() {
  let mut builder = ElementTreeBuilder::new();
  let root = builder.open_element("div");
  builder.close_element();
  let mut elements = builder.finish();
  attach(
    &mut elements,
    root,
    "display: block; width: 100px; height: 50px",
  );

  let boxes = layout(&elements, root);

  assert_eq!(boxes.subtree_count(), 1);
  let subtree = boxes.subtree(SubtreeId(0));
  assert_eq!(subtree.len(), 2, "initial containing block plus the root");
  assert_eq!(subtree.skip(BlockIndex(0)), 2);
  assert_eq!(subtree.skip(BlockIndex(1)), 1);

  let icb = subtree.size(BlockIndex(0));
  assert_eq!(icb.content, Size::new(px(400), px(400)));

  let root_box = subtree.size(BlockIndex(1));
  assert_eq!(root_box.content, Size::new(px(100), px(50)));
  assert_eq!(root_box.border, Size::new(px(100), px(50)));
  assert_eq!(subtree.offsets(BlockIndex(1)).border, Point::ZERO);

  // Exactly one stacking context, owned by the root element's block.
  let contexts = &boxes.stacking_contexts;
  assert_eq!(contexts.len(), 1);
  let entry = contexts.entry(0);
  assert_eq!(entry.skip, 1);
  assert_eq!(entry.z_index, 0);
  assert_eq!(entry.block.subtree, SubtreeId(0));
  assert_eq!(entry.block.index, BlockIndex(1));

  assert_skip_invariant(&boxes);
}

#[test]
fn nested_inline_blocks_become_sibling_contexts() {
  // Four right-nested inline-blocks with shrinking widths; each holds a
  // text run and (except the innermost) the next inline-block.
  let mut builder = ElementTreeBuilder::new();
  let root = builder.open_element("main");
  let ib1 = builder.open_element("div");
  builder.text("one");
  let ib2 = builder.open_element("div");
  builder.text("two");
  let ib3 = builder.open_element("div");
  builder.text("tre");
  let ib4 = builder.open_element("div");
  builder.text("for");
  builder.close_element();
  builder.close_element();
  builder.close_element();
  builder.close_element();
  builder.close_element();
  let mut elements = builder.finish();

  attach(&mut elements, root, "display: block");
  for (element, width) in [(ib1, "350px"), (ib2, "100px"), (ib3, "50px"), (ib4, "25px")] {
    attach(
      &mut elements,
      element,
      &format!("display: inline-block; width: {width}; padding-left: 10px"),
    );
  }

  let boxes = layout(&elements, root);

  // One subtree per inline-block on top of the main flow.
  assert_eq!(boxes.subtree_count(), 5);
  for (index, width) in [(1u8, 350), (2, 100), (3, 50), (4, 25)] {
    let subtree = boxes.subtree(SubtreeId(index));
    let size = subtree.size(BlockIndex(0));
    assert_eq!(size.content.width, px(width));
    assert_eq!(size.border.width, px(width + 10), "padding-left widens the border box");
  }

  // The root context plus four inline-block contexts, all siblings
  // under the root despite the element nesting.
  let contexts = &boxes.stacking_contexts;
  assert_eq!(contexts.len(), 5);
  assert_eq!(contexts.entry(0).skip, 5);
  let children: Vec<_> = contexts.children(0).collect();
  assert_eq!(children.len(), 4);
  for (position, &context) in children.iter().enumerate() {
    let entry = contexts.entry(context);
    assert_eq!(entry.skip, 1, "inline-block contexts host nothing");
    assert_eq!(entry.block.subtree, SubtreeId(position as u8 + 1));
  }

  // Every context paints exactly one inline formatting context; each
  // inline-block context's IFC carries its text run.
  for index in 0..contexts.len() {
    let entry = contexts.entry(index);
    assert_eq!(entry.ifcs.len(), 1, "context {index} has one IFC");
  }
  for &context in &children {
    let entry = contexts.entry(context);
    let ifc = boxes.ifc(entry.ifcs[0]);
    let has_text = ifc
      .items
      .iter()
      .any(|item| matches!(item, InlineItem::TextRun(_)));
    assert!(has_text, "inline-block context paints a text run");
  }

  assert_skip_invariant(&boxes);
}

#[test]
fn z_index_orders_sibling_contexts() {
  // Five block children: one static, four relatively positioned with
  // z-indices 6, -2, auto, -5.
  let mut builder = ElementTreeBuilder::new();
  let root = builder.open_element("div");
  let plain = builder.open_element("div");
  builder.close_element();
  let z6 = builder.open_element("div");
  builder.close_element();
  let z_neg2 = builder.open_element("div");
  builder.close_element();
  let z_auto = builder.open_element("div");
  builder.close_element();
  let z_neg5 = builder.open_element("div");
  builder.close_element();
  builder.close_element();
  let mut elements = builder.finish();

  attach(&mut elements, root, "display: block");
  attach(&mut elements, plain, "display: block; height: 10px");
  attach(&mut elements, z6, "display: block; position: relative; z-index: 6");
  attach(&mut elements, z_neg2, "display: block; position: relative; z-index: -2");
  attach(&mut elements, z_auto, "display: block; position: relative");
  attach(&mut elements, z_neg5, "display: block; position: relative; z-index: -5");

  let boxes = layout(&elements, root);

  let contexts = &boxes.stacking_contexts;
  // Root plus the four positioned children; the static child creates
  // nothing.
  assert_eq!(contexts.len(), 5);
  let z_order: Vec<i32> = contexts
    .children(0)
    .map(|child| contexts.entry(child).z_index)
    .collect();
  assert_eq!(z_order, vec![-5, -2, 0, 6]);

  // Document order is preserved in the block column even though paint
  // order is not.
  let child_blocks: Vec<_> = contexts
    .children(0)
    .map(|child| contexts.entry(child).block)
    .collect();
  assert_eq!(child_blocks[0], boxes.block_for_element(z_neg5).unwrap());
  assert_eq!(child_blocks[1], boxes.block_for_element(z_neg2).unwrap());
  assert_eq!(child_blocks[2], boxes.block_for_element(z_auto).unwrap());
  assert_eq!(child_blocks[3], boxes.block_for_element(z6).unwrap());

  assert_skip_invariant(&boxes);
}

#[test]
fn blocks_stack_vertically_with_margins() {
  let mut builder = ElementTreeBuilder::new();
  let root = builder.open_element("div");
  let first = builder.open_element("div");
  builder.close_element();
  let second = builder.open_element("div");
  builder.close_element();
  builder.close_element();
  let mut elements = builder.finish();

  attach(&mut elements, root, "display: block");
  attach(&mut elements, first, "display: block; height: 30px; margin-bottom: 5px");
  attach(&mut elements, second, "display: block; height: 20px; margin-top: 7px");

  let boxes = layout(&elements, root);
  let subtree = boxes.subtree(SubtreeId(0));

  let first_block = boxes.block_for_element(first).unwrap().index;
  let second_block = boxes.block_for_element(second).unwrap().index;
  assert_eq!(subtree.offsets(first_block).border.y, 0);
  // No margin collapsing: 30 + 5 + 7.
  assert_eq!(subtree.offsets(second_block).border.y, px(42));
  // Root auto height: 30 + 5 + 7 + 20.
  let root_block = boxes.block_for_element(root).unwrap().index;
  assert_eq!(subtree.size(root_block).content.height, px(62));
}

#[test]
fn relative_position_offsets_do_not_move_flow() {
  let mut builder = ElementTreeBuilder::new();
  let root = builder.open_element("div");
  let shifted = builder.open_element("div");
  builder.close_element();
  let after = builder.open_element("div");
  builder.close_element();
  builder.close_element();
  let mut elements = builder.finish();

  attach(&mut elements, root, "display: block");
  attach(
    &mut elements,
    shifted,
    "display: block; position: relative; left: 15px; top: 10px; height: 20px",
  );
  attach(&mut elements, after, "display: block; height: 20px");

  let boxes = layout(&elements, root);
  let subtree = boxes.subtree(SubtreeId(0));

  let shifted_block = boxes.block_for_element(shifted).unwrap().index;
  assert_eq!(
    subtree.offsets(shifted_block).border,
    Point::new(px(15), px(10))
  );
  // The following sibling lays out as if the offset never happened.
  let after_block = boxes.block_for_element(after).unwrap().index;
  assert_eq!(subtree.offsets(after_block).border, Point::new(0, px(20)));
}

#[test]
fn absolute_boxes_leave_the_flow() {
  let mut builder = ElementTreeBuilder::new();
  let root = builder.open_element("div");
  let abs = builder.open_element("div");
  builder.close_element();
  let flow = builder.open_element("div");
  builder.close_element();
  builder.close_element();
  let mut elements = builder.finish();

  attach(&mut elements, root, "display: block");
  attach(
    &mut elements,
    abs,
    "display: block; position: absolute; left: 30px; top: 40px; width: 50px; height: 60px",
  );
  attach(&mut elements, flow, "display: block; height: 20px");

  let boxes = layout(&elements, root);

  // The absolute box gets its own subtree, positioned against the
  // initial containing block.
  let abs_ref = boxes.block_for_element(abs).unwrap();
  assert_ne!(abs_ref.subtree, SubtreeId(0));
  let abs_subtree = boxes.subtree(abs_ref.subtree);
  assert_eq!(
    abs_subtree.offsets(abs_ref.index).border,
    Point::new(px(30), px(40))
  );
  assert_eq!(
    abs_subtree.size(abs_ref.index).content,
    Size::new(px(50), px(60))
  );

  // It contributes nothing to the parent's auto height.
  let root_block = boxes.block_for_element(root).unwrap().index;
  let subtree = boxes.subtree(SubtreeId(0));
  assert_eq!(subtree.size(root_block).content.height, px(20));

  // And its context does not parent anything.
  let contexts = &boxes.stacking_contexts;
  assert_eq!(contexts.len(), 2);
  assert_eq!(contexts.entry(1).skip, 1);
}

#[test]
fn text_root_document() {
  let mut builder = ElementTreeBuilder::new();
  let root = builder.text("hello viewport");
  let elements = builder.finish();

  let boxes = layout(&elements, root);
  assert_eq!(boxes.subtree_count(), 1);
  assert_eq!(boxes.ifcs().len(), 1);
  let ifc = &boxes.ifcs()[0];
  assert_eq!(ifc.lines.len(), 1);
  assert_eq!(ifc.parent_block, boxes.initial_containing_block());
}

#[test]
fn layout_is_deterministic() {
  let mut builder = ElementTreeBuilder::new();
  let root = builder.open_element("div");
  let child = builder.open_element("div");
  builder.text("some words to lay out across lines maybe");
  builder.close_element();
  builder.close_element();
  let mut elements = builder.finish();
  attach(&mut elements, root, "display: block");
  attach(&mut elements, child, "display: block; width: 120px");

  let first = layout(&elements, root);
  let second = layout(&elements, root);

  assert_eq!(first.subtree_count(), second.subtree_count());
  for subtree_index in 0..first.subtree_count() {
    let a = first.subtree(SubtreeId(subtree_index as u8));
    let b = second.subtree(SubtreeId(subtree_index as u8));
    assert_eq!(a.len(), b.len());
    for block in 0..a.len() {
      let block = BlockIndex(block);
      assert_eq!(a.skip(block), b.skip(block));
      assert_eq!(a.offsets(block), b.offsets(block));
      assert_eq!(a.size(block), b.size(block));
    }
  }
  assert_eq!(first.ifcs().len(), second.ifcs().len());
  for (a, b) in first.ifcs().iter().zip(second.ifcs()) {
    assert_eq!(a.lines, b.lines);
    assert_eq!(a.items, b.items);
  }
  assert_eq!(
    first.stacking_contexts.len(),
    second.stacking_contexts.len()
  );
  for index in 0..first.stacking_contexts.len() {
    assert_eq!(
      first.stacking_contexts.entry(index),
      second.stacking_contexts.entry(index)
    );
  }
}
