//! Phase 5 — Interaction testing (4.G). Clicks every testable candidate,
//! measures a three-scale visual delta, and — for clicks that look like they
//! opened a modal — cascades into the newly revealed surface before
//! returning to the root state.

use crate::config::SandboxConfig;
use crate::page::PageHandle;
use crate::phase3_scene;
use crate::phase4_inputs;
use crate::scene_script::{FIND_AND_CLICK_CLOSE_SCRIPT, PAUSE_ANIMATIONS_SCRIPT};
use crate::types::{InputCandidate, InteractionResult, PhaseResult, SceneGraph, VisualDelta};
use common_types::BoundingBox;
use futures::future::{BoxFuture, FutureExt};
use image::GenericImageView;
use std::collections::HashSet;
use std::time::Instant;

const STOP_AFTER_RESPONSIVE: usize = 5;
const STOP_AFTER_TOTAL: usize = 8;
const STOP_AFTER_TOTAL_CASCADING: usize = 12;
/// Grayscale value delta below which a pixel is treated as unchanged
/// (filters anti-aliasing/compression noise rather than real content change).
const PIXEL_NOISE_FLOOR: i16 = 12;

struct Budget {
    responsive: usize,
    tested: usize,
    limit: usize,
}

impl Budget {
    fn exhausted(&self) -> bool {
        self.responsive >= STOP_AFTER_RESPONSIVE || self.tested >= self.limit
    }
}

pub async fn run(
    page: &dyn PageHandle,
    html: &str,
    graph: &SceneGraph,
    candidates: &[InputCandidate],
    config: &SandboxConfig,
) -> (PhaseResult, Vec<InteractionResult>) {
    let start = Instant::now();
    let _ = page.evaluate(PAUSE_ANIMATIONS_SCRIPT).await;

    let testable: Vec<&InputCandidate> = candidates.iter().filter(|c| c.testable).collect();
    if testable.is_empty() {
        return (
            PhaseResult::ok(5, "interaction_testing", serde_json::json!({ "static": true }), start.elapsed().as_millis() as u64),
            Vec::new(),
        );
    }

    let cascading_enabled = config.max_cascade_depth > 0;
    let limit = if cascading_enabled { STOP_AFTER_TOTAL_CASCADING } else { STOP_AFTER_TOTAL };
    let mut budget = Budget { responsive: 0, tested: 0, limit };
    let mut results = Vec::new();
    let mut tested_selectors: HashSet<String> = HashSet::new();
    let mut js_error_seen = false;

    for candidate in testable {
        if budget.exhausted() {
            break;
        }
        if tested_selectors.contains(&candidate.selector) {
            continue;
        }
        test_one(
            page,
            html,
            graph,
            candidate,
            0,
            config,
            &mut budget,
            &mut tested_selectors,
            &mut results,
            &mut js_error_seen,
        )
        .await;
    }

    let page_errors = page.drain_page_errors();
    if !page_errors.is_empty() {
        js_error_seen = true;
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    let details = serde_json::json!({
        "tested": budget.tested,
        "responsive": budget.responsive,
        "js_error_seen": js_error_seen,
    });
    if js_error_seen {
        return (
            PhaseResult::fail(5, "interaction_testing", "JS error occurred during interaction testing", duration_ms),
            results,
        );
    }
    (PhaseResult::ok(5, "interaction_testing", details, duration_ms), results)
}

/// Boxed so the cascade recursion (root click -> modal candidates -> their own
/// cascades, bounded by `config.max_cascade_depth`) compiles as `async fn`
/// bodies can't recurse directly.
fn test_one<'a>(
    page: &'a dyn PageHandle,
    html: &'a str,
    root_graph: &'a SceneGraph,
    candidate: &'a InputCandidate,
    cascade_level: u8,
    config: &'a SandboxConfig,
    budget: &'a mut Budget,
    tested_selectors: &'a mut HashSet<String>,
    results: &'a mut Vec<InteractionResult>,
    js_error_seen: &'a mut bool,
) -> BoxFuture<'a, ()> {
    async move {
        tested_selectors.insert(candidate.selector.clone());
        budget.tested += 1;

        let before_png = page.screenshot_png().await.unwrap_or_default();
        let before_graph = phase3_scene::run(page).await.1;

        let click_start = Instant::now();
        let clicked = page.click_selector(&candidate.selector, config.interaction_timeout()).await;

        let (responsive, visual_delta, after_graph, error) = match clicked {
            Ok(false) => (false, None, before_graph.clone(), Some("element not clickable (disabled or invisible)".to_string())),
            Err(e) => (false, None, before_graph.clone(), Some(e.to_string())),
            Ok(true) => {
                tokio::time::sleep(config.stabilization()).await;
                let after_png = page.screenshot_png().await.unwrap_or_default();
                let after_graph = phase3_scene::run(page).await.1;

                let delta = compute_visual_delta(&before_png, &after_png, &candidate.node.bounding_box).ok();
                let visually_responsive = delta
                    .as_ref()
                    .map(|d| d.has_visible_change(config.visual_change_threshold, config.element_threshold))
                    .unwrap_or(false);
                let structurally_responsive = !visually_responsive && scene_graph_changed(&before_graph, &after_graph);

                (visually_responsive || structurally_responsive, delta, after_graph, None)
            }
        };

        if !page.drain_console_errors().is_empty() {
            *js_error_seen = true;
        }

        if responsive {
            budget.responsive += 1;
        }

        let triggered_cascade = responsive
            && cascade_level < config.max_cascade_depth
            && is_modal_open(root_graph, &after_graph, config.modal_open_threshold);

        results.push(InteractionResult {
            input: candidate.clone(),
            action: "click".to_string(),
            visual_delta,
            scene_before: Some(before_graph),
            scene_after: Some(after_graph.clone()),
            responsive,
            error,
            duration_ms: click_start.elapsed().as_millis() as u64,
            screenshot_before: None,
            screenshot_after: None,
            cascade_level,
            cascade_trigger: if triggered_cascade { Some(candidate.selector.clone()) } else { None },
        });

        if triggered_cascade && !budget.exhausted() {
            let (_, fresh_candidates) = phase4_inputs::run(page, &after_graph, config).await;
            let new_candidates: Vec<InputCandidate> = fresh_candidates
                .into_iter()
                .filter(|c| c.testable && !tested_selectors.contains(&c.selector))
                .take(config.max_cascade_elements)
                .collect();

            for nested in &new_candidates {
                if budget.exhausted() {
                    break;
                }
                test_one(page, html, root_graph, nested, cascade_level + 1, config, budget, tested_selectors, results, js_error_seen).await;
            }

            restore_root_state(page, html, config).await;
        }
    }
    .boxed()
}

/// Cascade trigger (4.G Phase 5): a click that changed >= 15% of the viewport
/// or revealed >= 5 new visible nodes looks like it opened a modal.
fn is_modal_open(root_before: &SceneGraph, after: &SceneGraph, modal_open_threshold: f64) -> bool {
    let before_set: HashSet<&str> = root_before.visible_nodes().map(|n| n.selector.as_str()).collect();
    let new_nodes = after.visible_nodes().filter(|n| !before_set.contains(n.selector.as_str())).count();
    if new_nodes >= 5 {
        return true;
    }
    let viewport_area = (root_before.viewport_width as f64) * (root_before.viewport_height as f64);
    if viewport_area <= 0.0 {
        return false;
    }
    let changed_area: f64 = after
        .visible_nodes()
        .filter(|n| !before_set.contains(n.selector.as_str()))
        .map(|n| n.bounding_box.area())
        .sum();
    changed_area / viewport_area >= modal_open_threshold
}

async fn restore_root_state(page: &dyn PageHandle, html: &str, config: &SandboxConfig) {
    if let Ok(closed) = page.evaluate(FIND_AND_CLICK_CLOSE_SCRIPT).await {
        if closed.as_bool() == Some(true) {
            tokio::time::sleep(config.stabilization()).await;
            return;
        }
    }
    if page.press_escape().await.is_ok() {
        tokio::time::sleep(config.stabilization()).await;
        return;
    }
    let _ = page.set_content(html, config.viewport_width, config.viewport_height, config.render_timeout()).await;
}

/// Scene-graph delta fallback (4.G Phase 5 step 7): >= 2 added/removed
/// visible nodes, or any surviving node shifting position/size by > 10px.
fn scene_graph_changed(before: &SceneGraph, after: &SceneGraph) -> bool {
    let before_set: HashSet<&str> = before.visible_nodes().map(|n| n.selector.as_str()).collect();
    let after_set: HashSet<&str> = after.visible_nodes().map(|n| n.selector.as_str()).collect();
    let added = after_set.difference(&before_set).count();
    let removed = before_set.difference(&after_set).count();
    if added + removed >= 2 {
        return true;
    }
    after.visible_nodes().any(|n| {
        before
            .find_by_selector(&n.selector)
            .map(|prev| prev.bounding_box.position_shift(&n.bounding_box) > 10.0 || prev.bounding_box.size_shift(&n.bounding_box) > 10.0)
            .unwrap_or(false)
    })
}

fn region_diff(before: &image::GrayImage, after: &image::GrayImage, region: Option<BoundingBox>, w: u32, h: u32) -> (u64, u64) {
    let (x0, y0, x1, y1) = match region {
        Some(r) => {
            let x0 = r.x.max(0.0) as u32;
            let y0 = r.y.max(0.0) as u32;
            let x1 = ((r.x + r.width).max(0.0) as u32).min(w);
            let y1 = ((r.y + r.height).max(0.0) as u32).min(h);
            (x0, y0, x1.max(x0), y1.max(y0))
        }
        None => (0, 0, w, h),
    };

    let mut diff = 0u64;
    let mut total = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            total += 1;
            let a = before.get_pixel(x, y).0[0] as i16;
            let b = after.get_pixel(x, y).0[0] as i16;
            if (a - b).abs() > PIXEL_NOISE_FLOOR {
                diff += 1;
            }
        }
    }
    (diff, total)
}

fn ratio(diff: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        diff as f64 / total as f64
    }
}

/// Compares before/after screenshots at tight (+20px), normal (+100px), and
/// full-page scale, taking the maximum `pixel_diff_ratio` (4.G Phase 5 step 6).
/// The tight-scale ratio is carried as the element-level stat.
pub fn compute_visual_delta(before_png: &[u8], after_png: &[u8], bbox: &BoundingBox) -> Result<VisualDelta, String> {
    let before_img = image::load_from_memory(before_png).map_err(|e| format!("failed to decode before screenshot: {e}"))?;
    let after_img = image::load_from_memory(after_png).map_err(|e| format!("failed to decode after screenshot: {e}"))?;
    let (before_gray, after_gray) = (before_img.to_luma8(), after_img.to_luma8());
    let w = before_img.dimensions().0.min(after_img.dimensions().0);
    let h = before_img.dimensions().1.min(after_img.dimensions().1);

    let tight = bbox.expand(20.0);
    let normal = bbox.expand(100.0);

    let scales = [
        (region_diff(&before_gray, &after_gray, Some(tight), w, h), Some(tight)),
        (region_diff(&before_gray, &after_gray, Some(normal), w, h), Some(normal)),
        (region_diff(&before_gray, &after_gray, None, w, h), None),
    ];

    let ((tight_diff, tight_total), _) = scales[0];
    let tight_ratio = ratio(tight_diff, tight_total);

    let ((max_diff, max_total), max_region) = scales
        .into_iter()
        .max_by(|a, b| ratio(a.0 .0, a.0 .1).partial_cmp(&ratio(b.0 .0, b.0 .1)).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap();

    Ok(VisualDelta::new(max_diff, max_total, max_region).with_element_stats(tight_total, tight_ratio))
}
