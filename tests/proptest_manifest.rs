//! Property tests for class-list merging, label remapping and region clipping.

use std::path::Path;

use berryscan::dataset::label::remap_label_text;
use berryscan::dataset::{merge_class_names, normalize_name, IndexMapping, RemapPolicy};
use berryscan::geometry::{BBoxXYXY, Pixel, PixelRect};
use proptest::prelude::*;

mod proptest_helpers;
use proptest_helpers::{arb_box, arb_class_list, arb_label_line, proptest_config};

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn merged_names_extend_target_and_cover_source(
        target in arb_class_list(8),
        source in arb_class_list(8),
    ) {
        let merge = merge_class_names(&target, &source).expect("merge never fails");

        prop_assert_eq!(&merge.names[..target.len()], &target[..]);
        prop_assert_eq!(merge.names.len(), target.len() + merge.appended.len());
        prop_assert_eq!(merge.mapping.len(), source.len());

        for (index, name) in source.iter().enumerate() {
            let mapped = merge.mapping.get(index).expect("total mapping");
            prop_assert_eq!(normalize_name(&merge.names[mapped]), normalize_name(name));
            // The first matching slot is chosen.
            let first = merge
                .names
                .iter()
                .position(|n| normalize_name(n) == normalize_name(name))
                .expect("present");
            prop_assert_eq!(mapped, first);
        }
    }

    #[test]
    fn merging_twice_changes_nothing(
        target in arb_class_list(8),
        source in arb_class_list(8),
    ) {
        let first = merge_class_names(&target, &source).expect("first merge");
        let second = merge_class_names(&first.names, &source).expect("second merge");

        prop_assert_eq!(&second.names, &first.names);
        prop_assert!(second.appended.is_empty());
        prop_assert_eq!(second.mapping, first.mapping);
    }

    #[test]
    fn remap_rewrites_only_class_indices(
        lines in prop::collection::vec(arb_label_line(6), 0..12),
        targets in prop::collection::vec(0usize..40, 6),
    ) {
        let mapping: IndexMapping = targets.iter().copied().enumerate().collect();
        let content: String = lines
            .iter()
            .map(|(class_id, tokens)| format!("{} {}\n", class_id, tokens.join(" ")))
            .collect();

        let (out, stats) = remap_label_text(&content, &mapping, RemapPolicy::Strict, Path::new("p.txt"))
            .expect("every index is mapped");

        prop_assert_eq!(stats.lines, lines.len());
        let out_lines: Vec<&str> = out.lines().collect();
        prop_assert_eq!(out_lines.len(), lines.len());
        for ((class_id, tokens), line) in lines.iter().zip(out_lines) {
            let mut parts = line.split(' ');
            let new_id: usize = parts.next().expect("class").parse().expect("integer");
            prop_assert_eq!(new_id, targets[*class_id]);
            let rest: Vec<&str> = parts.collect();
            prop_assert_eq!(rest, tokens.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }

    #[test]
    fn clipped_rects_lie_inside_the_image(
        coords in arb_box(),
        width in 1u32..800,
        height in 1u32..800,
    ) {
        let bbox: BBoxXYXY<Pixel> = BBoxXYXY::from_array(coords);
        if let Some(rect) = PixelRect::clip(&bbox, width, height) {
            prop_assert!(rect.x1 < rect.x2 && rect.x2 <= width);
            prop_assert!(rect.y1 < rect.y2 && rect.y2 <= height);
        } else {
            let x1 = coords[0].trunc().clamp(0.0, f64::from(width));
            let x2 = coords[2].trunc().clamp(0.0, f64::from(width));
            let y1 = coords[1].trunc().clamp(0.0, f64::from(height));
            let y2 = coords[3].trunc().clamp(0.0, f64::from(height));
            prop_assert!(x2 <= x1 || y2 <= y1);
        }
    }
}
