#![no_main]

use libfuzzer_sys::fuzz_target;
use pivotrello_core::model::{Story, StoryKind, StoryState};
use pivotrello_core::order::resolve_positions;

/// Three bytes per story: id, before link, after link. Zero means no link.
fuzz_target!(|data: &[u8]| {
    let stories: Vec<Story> = data
        .chunks_exact(3)
        .map(|chunk| {
            let mut story = Story::new(
                u64::from(chunk[0]),
                "fuzz",
                StoryKind::Feature,
                StoryState::Started,
            );
            story.before_id = (chunk[1] != 0).then(|| u64::from(chunk[1]));
            story.after_id = (chunk[2] != 0).then(|| u64::from(chunk[2]));
            story
        })
        .collect();

    if let Ok(positions) = resolve_positions(&stories) {
        let ordered = positions.ordered_ids();
        assert_eq!(ordered.len(), positions.len());
        for (index, id) in ordered.iter().enumerate() {
            let rank = positions.rank(*id).expect("ordered id has a rank");
            assert_eq!(rank as usize, index + 1);
        }
    }
});
