use rubric_core::db::open_db_in_memory;
use rubric_core::{
    BlockNode, GradeNode, GradingError, MalformedTreeError, Node, Operator,
    SqliteTemplateRepository, TemplateService, TemplateServiceError, TemplateState,
    ValidationError, MAX_TREE_DEPTH,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn album_score() -> BlockNode {
    BlockNode::new(
        "Album Score",
        vec![
            GradeNode::new("Production", 1.0, 10.0, 1.0).unwrap().into(),
            GradeNode::new("Lyrics", 1.0, 10.0, 1.0).unwrap().into(),
        ],
        vec![Operator::Add],
    )
    .unwrap()
}

fn weighted_score() -> BlockNode {
    let inner = album_score();
    BlockNode::new(
        "Weighted",
        vec![
            inner.into(),
            GradeNode::new("Weight", 0.5, 2.0, 0.5).unwrap().into(),
        ],
        vec![Operator::Multiply],
    )
    .unwrap()
}

/// Single-child blocks around one leaf, the leaf sitting at `levels`.
fn nested_to_depth(levels: usize) -> BlockNode {
    let mut block = BlockNode::new(
        "Innermost",
        vec![GradeNode::new("Core", 1.0, 10.0, 1.0).unwrap().into()],
        Vec::new(),
    )
    .unwrap();
    for level in 2..levels {
        block = BlockNode::new(format!("Wrapper {level}"), vec![Node::Block(block)], Vec::new())
            .unwrap();
    }
    block
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn create_then_load_round_trips_definition() {
    let conn = setup();
    let service = TemplateService::new(SqliteTemplateRepository::try_new(&conn).unwrap());

    let template_id = service
        .create_template("  Album Score  ", "critic-1", true, album_score())
        .unwrap();

    assert_eq!(service.load_template(template_id).unwrap(), album_score());

    let template = service.get_template(template_id).unwrap();
    assert_eq!(template.id, template_id);
    assert_eq!(template.name, "Album Score");
    assert_eq!(template.creator_id, "critic-1");
    assert!(template.is_public);
    assert_eq!(template.state, TemplateState::Published);
    assert!(template.created_at > 0);

    let evaluation = template.evaluate().unwrap();
    assert_eq!(evaluation.min, 2.0);
    assert_eq!(evaluation.max, 20.0);
    assert_eq!(evaluation.grade, None);
}

#[test]
fn invalid_definition_writes_nothing() {
    let conn = setup();
    let service = TemplateService::new(SqliteTemplateRepository::try_new(&conn).unwrap());

    let mut broken = BlockNode::empty("Broken");
    broken.add_child(GradeNode::new("A", 0.0, 1.0, 1.0).unwrap());
    broken.add_child(GradeNode::new("B", 0.0, 1.0, 1.0).unwrap());

    let err = service
        .create_template("Broken", "critic-1", false, broken)
        .unwrap_err();
    assert!(matches!(
        err,
        TemplateServiceError::Validation(ValidationError::OperatorCountMismatch { .. })
    ));

    let err = service
        .create_template("   ", "critic-1", false, album_score())
        .unwrap_err();
    assert!(matches!(
        err,
        TemplateServiceError::Validation(ValidationError::BlankName)
    ));

    assert_eq!(count_rows(&conn, "rubric_templates"), 0);
    assert_eq!(count_rows(&conn, "rubric_components"), 0);
    assert_eq!(count_rows(&conn, "rubric_actions"), 0);
}

#[test]
fn update_replaces_whole_tree_and_marks_updated() {
    let conn = setup();
    let service = TemplateService::new(SqliteTemplateRepository::try_new(&conn).unwrap());
    let template_id = service
        .create_template("Album Score", "critic-1", false, album_score())
        .unwrap();

    let header = service
        .update_template(template_id, weighted_score())
        .unwrap();
    assert_eq!(header.state, TemplateState::Updated);
    assert_eq!(service.load_template(template_id).unwrap(), weighted_score());

    // 1 root + 1 nested block + 3 leaves, old rows gone.
    assert_eq!(count_rows(&conn, "rubric_components"), 5);
    assert_eq!(count_rows(&conn, "rubric_actions"), 2);

    let err = service
        .update_template(Uuid::new_v4(), album_score())
        .unwrap_err();
    assert!(matches!(err, TemplateServiceError::NotFound(_)));
}

#[test]
fn deleted_template_behaves_as_not_found() {
    let conn = setup();
    let service = TemplateService::new(SqliteTemplateRepository::try_new(&conn).unwrap());
    let template_id = service
        .create_template("Album Score", "critic-1", true, album_score())
        .unwrap();

    service.delete_template(template_id).unwrap();

    assert!(matches!(
        service.load_template(template_id),
        Err(TemplateServiceError::NotFound(id)) if id == template_id
    ));
    assert!(matches!(
        service.delete_template(template_id),
        Err(TemplateServiceError::NotFound(_))
    ));
    assert!(matches!(
        service.update_template(template_id, album_score()),
        Err(TemplateServiceError::NotFound(_))
    ));
    assert!(matches!(
        service.set_visibility(template_id, false),
        Err(TemplateServiceError::NotFound(_))
    ));
    assert!(service.list_templates("critic-1").unwrap().is_empty());
}

#[test]
fn listing_respects_visibility_and_ownership() {
    let conn = setup();
    let service = TemplateService::new(SqliteTemplateRepository::try_new(&conn).unwrap());
    let public_id = service
        .create_template("Public", "critic-1", true, album_score())
        .unwrap();
    let private_id = service
        .create_template("Private", "critic-1", false, album_score())
        .unwrap();

    let owner_view: Vec<Uuid> = service
        .list_templates("critic-1")
        .unwrap()
        .into_iter()
        .map(|header| header.template_id)
        .collect();
    assert_eq!(owner_view.len(), 2);
    assert!(owner_view.contains(&public_id));
    assert!(owner_view.contains(&private_id));

    let stranger_view = service.list_templates("critic-2").unwrap();
    assert_eq!(stranger_view.len(), 1);
    assert_eq!(stranger_view[0].template_id, public_id);

    service.set_visibility(private_id, true).unwrap();
    assert_eq!(service.list_templates("critic-2").unwrap().len(), 2);
}

#[test]
fn empty_root_is_storable_but_not_gradable() {
    let conn = setup();
    let service = TemplateService::new(SqliteTemplateRepository::try_new(&conn).unwrap());
    let template_id = service
        .create_template("Draft Rubric", "critic-1", false, BlockNode::empty("Draft Rubric"))
        .unwrap();

    let template = service.get_template(template_id).unwrap();
    assert!(template.root.children().is_empty());
    assert!(matches!(
        template.evaluate(),
        Err(GradingError::EmptyBlock { .. })
    ));
}

#[test]
fn corrupted_rows_surface_as_malformed_tree() {
    let conn = setup();
    let service = TemplateService::new(SqliteTemplateRepository::try_new(&conn).unwrap());
    let template_id = service
        .create_template("Album Score", "critic-1", true, album_score())
        .unwrap();

    conn.execute(
        "DELETE FROM rubric_actions WHERE owner_uuid = ?1;",
        [template_id.to_string()],
    )
    .unwrap();

    let err = service.load_template(template_id).unwrap_err();
    match err {
        TemplateServiceError::MalformedTree {
            template_id: id,
            source: MalformedTreeError::OperatorCountMismatch { operators, .. },
        } => {
            assert_eq!(id, template_id);
            assert_eq!(operators, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn nesting_past_limit_is_rejected_before_write() {
    let conn = setup();
    let service = TemplateService::new(SqliteTemplateRepository::try_new(&conn).unwrap());

    let deepest = nested_to_depth(MAX_TREE_DEPTH);
    let template_id = service
        .create_template("Deep", "critic-1", false, deepest.clone())
        .unwrap();
    assert_eq!(service.load_template(template_id).unwrap(), deepest);
    let stored = count_rows(&conn, "rubric_components");

    let err = service
        .create_template("Too Deep", "critic-1", false, nested_to_depth(MAX_TREE_DEPTH + 1))
        .unwrap_err();
    match err {
        TemplateServiceError::Validation(ValidationError::TooDeep { limit }) => {
            assert_eq!(limit, MAX_TREE_DEPTH);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = service
        .update_template(template_id, nested_to_depth(MAX_TREE_DEPTH + 1))
        .unwrap_err();
    assert!(matches!(
        err,
        TemplateServiceError::Validation(ValidationError::TooDeep { .. })
    ));

    assert_eq!(count_rows(&conn, "rubric_templates"), 1);
    assert_eq!(count_rows(&conn, "rubric_components"), stored);
    assert_eq!(service.load_template(template_id).unwrap(), deepest);
}
