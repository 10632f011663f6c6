//! In-page JavaScript evaluated via [`crate::page::PageHandle::evaluate`]. Kept
//! as versioned string constants ("prompt text is data, not code" applies
//! equally to these injected scripts) rather than built up with a Rust-side
//! HTML/DOM library — the walk happens inside the real rendered page, which is
//! the only place layout and computed style are authoritative.

/// Walks every element, filters by viewport presence and minimum 5x5 size,
/// computes a deterministic unique selector, classifies node type, and returns
/// the scene graph as JSON (4.G Phase 3). Attribute whitelist: `type`, `role`,
/// `disabled`, `href`, `onclick`, `data-*`, ARIA state attributes, and
/// `cursor` when `pointer`.
pub const SCENE_GRAPH_SCRIPT: &str = r#"
(function() {
  function uniqueSelector(el) {
    if (el.id) return '#' + CSS.escape(el.id);
    for (const attr of el.attributes) {
      if (attr.name.startsWith('data-')) {
        const sel = '[' + attr.name + '="' + attr.value + '"]';
        if (document.querySelectorAll(sel).length === 1) return sel;
      }
    }
    if (el.classList.length > 0) {
      const sel = el.tagName.toLowerCase() + '.' + CSS.escape(el.classList[0]);
      if (document.querySelectorAll(sel).length === 1) return sel;
    }
    // nth-of-type path fallback.
    let path = [];
    let node = el;
    while (node && node.nodeType === 1 && node !== document.body.parentElement) {
      let sibIndex = 1;
      let sib = node.previousElementSibling;
      while (sib) {
        if (sib.tagName === node.tagName) sibIndex++;
        sib = sib.previousElementSibling;
      }
      path.unshift(node.tagName.toLowerCase() + ':nth-of-type(' + sibIndex + ')');
      node = node.parentElement;
    }
    return path.join(' > ');
  }

  function classify(el) {
    const tag = el.tagName.toLowerCase();
    if (tag === 'button' || (tag === 'input' && ['button', 'submit', 'reset'].includes(el.type))) return 'button';
    if (tag === 'input' || tag === 'select' || tag === 'textarea') return 'input';
    if (tag === 'img' || tag === 'svg' || tag === 'picture') return 'image';
    if (el.children.length === 0 && el.textContent.trim().length > 0) return 'text';
    if (el.children.length > 0) return 'container';
    return 'unknown';
  }

  const ATTR_WHITELIST = ['type', 'role', 'disabled', 'href', 'onclick'];
  const ARIA_STATE = ['aria-pressed', 'aria-selected', 'aria-checked', 'aria-expanded', 'aria-disabled'];

  const nodes = [];
  const all = document.body.querySelectorAll('*');
  const vw = window.innerWidth;
  const vh = window.innerHeight;

  for (const el of all) {
    const rect = el.getBoundingClientRect();
    if (rect.width < 5 || rect.height < 5) continue;
    if (rect.right < 0 || rect.bottom < 0 || rect.left > vw || rect.top > vh) continue;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') continue;

    const attributes = {};
    for (const name of ATTR_WHITELIST) {
      if (el.hasAttribute(name)) attributes[name] = el.getAttribute(name);
    }
    for (const name of ARIA_STATE) {
      if (el.hasAttribute(name)) attributes[name] = el.getAttribute(name);
    }
    for (const attr of el.attributes) {
      if (attr.name.startsWith('data-')) attributes[attr.name] = attr.value;
    }
    if (style.cursor === 'pointer') attributes['cursor'] = 'pointer';

    nodes.push({
      selector: uniqueSelector(el),
      tag: el.tagName.toLowerCase(),
      node_type: classify(el),
      bounding_box: { x: rect.left, y: rect.top, width: rect.width, height: rect.height },
      visible: parseFloat(style.opacity) > 0 && style.display !== 'none' && style.visibility !== 'hidden',
      z_index: parseInt(style.zIndex, 10) || 0,
      text: (el.textContent || '').trim().slice(0, 200),
      attributes: attributes,
      event_owner_candidate: null,
    });
  }

  return { nodes: nodes, viewport: { width: vw, height: vh } };
})()
"#;

/// Disables all CSS animations/transitions so Phase 5's before/after screenshot
/// comparison isn't polluted by ambient motion unrelated to the click.
pub const PAUSE_ANIMATIONS_SCRIPT: &str = r#"
(function() {
  const style = document.createElement('style');
  style.id = '__validator_pause_animations__';
  style.textContent = '*, *::before, *::after { animation-play-state: paused !important; transition: none !important; }';
  document.head.appendChild(style);
  return true;
})()
"#;

/// Attempts to find and click a close affordance (used by cascading validation
/// to return to the root state before the next candidate).
pub const FIND_AND_CLICK_CLOSE_SCRIPT: &str = r#"
(function() {
  const candidates = document.querySelectorAll(
    '[data-close], [data-dismiss], [aria-label="Close" i], button.close, .modal-close'
  );
  for (const el of candidates) {
    const rect = el.getBoundingClientRect();
    if (rect.width > 0 && rect.height > 0) { el.click(); return true; }
  }
  return false;
})()
"#;
