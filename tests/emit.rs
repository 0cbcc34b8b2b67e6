mod common;

use common::{collect_errors, peer};
use dom_stream::{
	memory::{MemoryHub, MemoryNode},
	Dom, NodeId, RecordId, SyncConfig, Value, SVG_NAMESPACE,
};
use url::Url;

#[test]
fn documents_are_written_with_patched_attributes() {
	let hub = MemoryHub::new();
	let config = SyncConfig::new().with_base_url(Url::parse("https://example.com/app/index.html").unwrap());
	let mut host = peer(&hub, config);
	let errors = collect_errors(&mut host);

	let dom = host.dom_mut();
	let comment = dom.create_comment("not synchronized");
	let link = dom.element("A", &[("href", "next.html"), ("class", "nav")], &[]);
	let anchor = dom.element("A", &[("href", "#top")], &[]);
	let input = dom.element("INPUT", &[("type", "search")], &[]);
	dom.user_input(input, "query");
	let svg = dom.create_element(Some(SVG_NAMESPACE), "svg").unwrap();
	let body = dom.element("BODY", &[], &[comment, link, anchor, input, svg]);
	dom.user_scroll(body, 0, 40);
	let html = dom.element("HTML", &[], &[body]);
	dom.replace_document_element(&html).unwrap();

	let root = host.set_on_store().unwrap();
	assert!(errors.borrow().is_empty());

	let record = |node: MemoryNode| hub.record(host.node_id(&node).unwrap().into()).unwrap();
	let bag = |node: MemoryNode| hub.record(record(node).attributes().unwrap().into()).unwrap();

	assert_eq!(record(html).tag_name(), Some("HTML"));
	assert_eq!(record(html).namespace_uri(), None);
	assert_eq!(hub.record(root.into()), Some(record(html)));

	let body_children: Vec<_> = [link, anchor, input, svg].iter().map(|node| RecordId::from(host.node_id(node).unwrap())).collect();
	assert_eq!(record(body).children(), Some(&body_children[..]));
	assert_eq!(host.node_id(&comment), None);
	assert_eq!(record(body).scroll_pos(), Some("[0,40]"));

	assert_eq!(bag(link).get("href"), Some(&Value::from("https://example.com/app/next.html")));
	assert_eq!(bag(link).get("class"), Some(&Value::from("nav")));
	assert_eq!(bag(anchor).get("href"), Some(&Value::from("#top")));
	assert_eq!(record(input).input_value(), Some("query"));
	assert_eq!(record(svg).namespace_uri(), Some(SVG_NAMESPACE));
	assert_eq!(record(svg).tag_name(), Some("svg"));
}

#[test]
fn emitted_documents_materialize_identically() {
	let hub = MemoryHub::new();
	let mut host = peer(&hub, SyncConfig::new());
	let dom = host.dom_mut();
	let svg = dom.create_element(Some(SVG_NAMESPACE), "svg").unwrap();
	let title = dom.create_text("Title");
	let h1 = dom.element("H1", &[("id", "title")], &[title]);
	let body = dom.element("BODY", &[("class", "a b")], &[h1, svg]);
	let html = dom.element("HTML", &[("lang", "en")], &[body]);
	dom.replace_document_element(&html).unwrap();
	let root = host.set_on_store().unwrap();

	let mut viewer = peer(&hub, SyncConfig::new());
	let viewer_root = viewer.read_from_store(root).unwrap();
	assert_eq!(viewer.dom().outer_html(viewer_root), host.dom().outer_html(html));

	let viewer_svg = viewer.dom().children(&viewer.dom().children(&viewer_root)[0])[1];
	assert_eq!(viewer.dom().namespace_uri(&viewer_svg).as_deref(), Some(SVG_NAMESPACE));
	assert_eq!(viewer.store().write_count(), 0);
}

#[test]
fn xlink_references_are_restored_in_their_namespace() {
	let hub = MemoryHub::new();
	hub.insert_record(RecordId(1), &[("tagName", Value::from("use")), ("namespaceURI", Value::from(SVG_NAMESPACE)), ("attributes", Value::Id(RecordId(2)))]);
	hub.insert_record(RecordId(2), &[("xlink:href", Value::from("#icon"))]);
	let mut viewer = peer(&hub, SyncConfig::new());
	let errors = collect_errors(&mut viewer);
	let root = viewer.read_from_store(NodeId(1)).unwrap();
	assert_eq!(viewer.dom().attribute(&root, "xlink:href").as_deref(), Some("#icon"));
	assert!(errors.borrow().is_empty());
}
