//! Property tests for normalization invariants

use crate::common::{block_on, offline_normalizer, TINY_PNG};
use md2any_export::{Resource, SessionStore};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Block {
    Text(String),
    SessionImage { registered: bool, pasted: bool },
    RemoteImage,
    EmbeddedImage,
    /// Embedded image whose `srcset` still names session handles.
    SrcsetImage,
    /// Comment wrapping markup that references a session handle.
    Comment,
}

fn block() -> impl Strategy<Value = Block> {
    prop_oneof![
        "[a-z]{1,8}( [a-z]{1,8}){0,3}".prop_map(Block::Text),
        (any::<bool>(), any::<bool>())
            .prop_map(|(registered, pasted)| Block::SessionImage { registered, pasted }),
        Just(Block::RemoteImage),
        Just(Block::EmbeddedImage),
        Just(Block::SrcsetImage),
        Just(Block::Comment),
    ]
}

/// Render blocks to HTML, tagging each with a unique marker, and register the
/// session handles that should resolve.
fn render(blocks: &[Block], store: &SessionStore) -> (String, Vec<(usize, bool)>) {
    let mut html = String::new();
    let mut survivors = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        let marker = format!("m{index}x");
        match block {
            Block::Text(text) => {
                html.push_str(&format!("<p>{marker} {text}</p>"));
                survivors.push((index, true));
            }
            Block::SessionImage { registered, pasted } => {
                let handle = if *pasted {
                    format!("img://{index}")
                } else {
                    format!("blob:http://localhost/{index}")
                };
                if *registered {
                    store.register(handle.clone(), Resource::new(TINY_PNG.clone(), None));
                    survivors.push((index, false));
                }
                html.push_str(&format!(r#"<p><img src="{handle}" alt="{marker}"></p>"#));
            }
            Block::RemoteImage => {
                html.push_str(&format!(
                    r#"<p><img src="https://example.com/{index}.png" alt="{marker}"></p>"#
                ));
                survivors.push((index, false));
            }
            Block::EmbeddedImage => {
                html.push_str(&format!(
                    r#"<p><img src="data:image/png;base64,AAAA" alt="{marker}"></p>"#
                ));
                survivors.push((index, false));
            }
            Block::SrcsetImage => {
                html.push_str(&format!(
                    r#"<p><img src="data:image/png;base64,AAAA" srcset="blob:http://localhost/{index} 1x, img://{index} 2x" alt="{marker}"></p>"#
                ));
                survivors.push((index, false));
            }
            Block::Comment => {
                html.push_str(&format!(
                    r#"<!-- <img src="blob:http://localhost/{index}"> img://{index} -->"#
                ));
            }
        }
    }
    (html, survivors)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn no_session_handles_survive(blocks in prop::collection::vec(block(), 0..8)) {
        let store = SessionStore::new();
        let (html, _) = render(&blocks, &store);
        let content = block_on(offline_normalizer(store).normalize(&html)).unwrap();
        prop_assert!(!content.html.contains("blob:"), "{}", content.html);
        prop_assert!(!content.html.contains("img://"), "{}", content.html);
    }

    #[test]
    fn sibling_order_is_preserved(blocks in prop::collection::vec(block(), 0..8)) {
        let store = SessionStore::new();
        let (html, survivors) = render(&blocks, &store);
        let content = block_on(offline_normalizer(store).normalize(&html)).unwrap();

        let mut last = 0;
        for (index, is_text) in survivors {
            let needle = if is_text {
                format!(">m{index}x ")
            } else {
                format!(r#"alt="m{index}x""#)
            };
            let position = content.html.find(&needle);
            prop_assert!(position.is_some(), "missing {needle} in {}", content.html);
            let position = position.unwrap();
            prop_assert!(position >= last);
            last = position;
        }
    }

    #[test]
    fn normalize_is_idempotent(blocks in prop::collection::vec(block(), 0..8)) {
        let store = SessionStore::new();
        let (html, _) = render(&blocks, &store);
        let normalizer = offline_normalizer(store);
        let once = block_on(normalizer.normalize(&html)).unwrap();
        let twice = block_on(normalizer.normalize(&once.html)).unwrap();
        prop_assert_eq!(once.html, twice.html);
        prop_assert_eq!(once.plain_text, twice.plain_text);
    }
}
