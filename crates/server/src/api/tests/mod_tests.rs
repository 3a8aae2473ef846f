use super::*;

use std::io::Cursor;

use axum::{body, http::StatusCode, response::IntoResponse};
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, RgbImage};
use report_core::ReportContext;
use shared::domain::{Role, SignStatus};
use storage::Storage;

struct Fixture {
    state: Arc<AppState>,
    inspector: i64,
    other: i64,
    admin: i64,
}

async fn setup() -> Fixture {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let inspector = storage
        .create_inspector("Julie Tremblay", Role::Inspector, true)
        .await
        .expect("inspector");
    let other = storage
        .create_inspector("Marc Gagnon", Role::Inspector, true)
        .await
        .expect("other");
    let admin = storage
        .create_inspector("Sophie Côté", Role::Admin, true)
        .await
        .expect("admin");
    let shared_storage = Arc::new(storage.clone());
    let state = AppState {
        reports: ReportContext::new(shared_storage.clone(), shared_storage),
        storage,
        history_limit: 50,
        max_body_bytes: 1024 * 1024,
    };
    Fixture {
        state: Arc::new(state),
        inspector: inspector.0,
        other: other.0,
        admin: admin.0,
    }
}

fn actor(inspector_id: i64) -> Query<ActorQuery> {
    Query(ActorQuery {
        inspector_id: Some(inspector_id),
    })
}

fn admin_query(inspector_id: i64) -> AdminTableQuery {
    AdminTableQuery {
        inspector_id: Some(inspector_id),
        show_resolved: false,
        show_archived: false,
        sector: None,
        sort: SortKey::Date,
    }
}

fn png_upload(file_name: &str) -> PhotoUpload {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(1600, 400))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("png");
    PhotoUpload {
        file_name: file_name.into(),
        data_b64: format!("data:image/png;base64,{}", STANDARD.encode(bytes)),
    }
}

fn open_request(trail: &str) -> SubmitReportRequest {
    SubmitReportRequest {
        status: Some(SignStatus::Open),
        sector: Some(Sector::MontOrford),
        trail: Some(trail.into()),
        comments: Some("Panneau tombé".into()),
        ..SubmitReportRequest::default()
    }
}

async fn submit(fx: &Fixture, req: SubmitReportRequest) -> ReportCreatedResponse {
    let (status, Json(created)) = create_report(State(fx.state.clone()), actor(fx.inspector), Json(req))
        .await
        .expect("create");
    assert_eq!(status, StatusCode::CREATED);
    created
}

#[tokio::test]
async fn missing_actor_is_unauthorized() {
    let fx = setup().await;

    let (status, Json(err)) = current_session(
        State(fx.state.clone()),
        Query(ActorQuery { inspector_id: None }),
    )
    .await
    .expect_err("should fail");

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(matches!(err.code, ErrorCode::Unauthorized));
}

#[tokio::test]
async fn session_describes_capabilities() {
    let fx = setup().await;

    let Json(info) = current_session(State(fx.state.clone()), actor(fx.admin))
        .await
        .expect("session");

    assert_eq!(info.name, "Sophie Côté");
    assert!(info.is_admin);
    assert!(info.may_submit);
}

#[tokio::test]
async fn sectors_list_every_catalog_entry() {
    let fx = setup().await;

    let Json(sectors) = list_sectors(State(fx.state.clone())).await;

    assert_eq!(sectors.len(), Sector::ALL.len());
    assert!(sectors.iter().all(|summary| !summary.trails.is_empty()));
}

#[tokio::test]
async fn invalid_submission_is_rejected_with_every_violation() {
    let fx = setup().await;

    let (status, Json(err)) = create_report(
        State(fx.state.clone()),
        actor(fx.inspector),
        Json(SubmitReportRequest::default()),
    )
    .await
    .expect_err("should fail");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(matches!(err.code, ErrorCode::Validation));
    let Json(history) = my_reports(State(fx.state.clone()), actor(fx.inspector))
        .await
        .expect("history");
    assert!(history.is_empty());
}

#[tokio::test]
async fn undecodable_base64_photo_is_a_validation_error() {
    let fx = setup().await;
    let req = SubmitReportRequest {
        photo: Some(PhotoUpload {
            file_name: "panneau.png".into(),
            data_b64: "%%%".into(),
        }),
        ..open_request("Sommet")
    };

    let (status, Json(err)) = create_report(State(fx.state.clone()), actor(fx.inspector), Json(req))
        .await
        .expect_err("should fail");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err.message.contains("panneau.png"));
}

#[tokio::test]
async fn photo_only_report_is_compressed_and_served_to_owner_and_admin() {
    let fx = setup().await;
    let req = SubmitReportRequest {
        status: None,
        photo: Some(png_upload("panneau.png")),
        ..open_request("Sommet")
    };

    let created = submit(&fx, req).await;
    let photo_ref = created.photo_ref.expect("photo stored");

    let response = download_photo(
        State(fx.state.clone()),
        Path(photo_ref.to_string()),
        actor(fx.inspector),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).expect("type"),
        "image/jpeg"
    );
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let decoded = image::load_from_memory(&bytes).expect("jpeg");
    assert_eq!((decoded.width(), decoded.height()), (1200, 300));

    let response = download_photo(
        State(fx.state.clone()),
        Path(photo_ref.to_string()),
        actor(fx.other),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = download_photo(
        State(fx.state.clone()),
        Path(format!("/{photo_ref}")),
        actor(fx.admin),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn foreign_photo_looks_the_same_as_a_missing_one() {
    let fx = setup().await;
    let created = submit(
        &fx,
        SubmitReportRequest {
            photo: Some(png_upload("panneau.png")),
            ..open_request("Sommet")
        },
    )
    .await;
    let photo_ref = created.photo_ref.expect("photo stored");
    let missing = format!("{photo_ref}.old");

    let mut bodies = Vec::new();
    for key in [photo_ref.to_string(), missing.clone()] {
        let response = download_photo(State(fx.state.clone()), Path(key), actor(fx.other))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let err: ApiError = serde_json::from_slice(&bytes).expect("error body");
        bodies.push(err);
    }

    assert_eq!(bodies[0].code, ErrorCode::NotFound);
    assert_eq!(bodies[1].code, ErrorCode::NotFound);
    assert_eq!(
        bodies[0].message.replace(&photo_ref.to_string(), "KEY"),
        bodies[1].message.replace(&missing, "KEY")
    );
}

#[tokio::test]
async fn unknown_photo_is_not_found() {
    let fx = setup().await;

    let response = download_photo(
        State(fx.state.clone()),
        Path("signalisations/1/absent.jpg".into()),
        actor(fx.admin),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn modify_keeps_stored_photo_unless_removed() {
    let fx = setup().await;
    let created = submit(
        &fx,
        SubmitReportRequest {
            photo: Some(png_upload("avant.png")),
            ..open_request("Sommet")
        },
    )
    .await;
    let original = created.photo_ref.clone().expect("photo");

    let Json(kept) = modify_report(
        State(fx.state.clone()),
        Path(created.report_id),
        actor(fx.inspector),
        Json(open_request("Alpage")),
    )
    .await
    .expect("modify");
    assert_eq!(kept.photo_ref, Some(original));

    let Json(removed) = modify_report(
        State(fx.state.clone()),
        Path(created.report_id),
        actor(fx.inspector),
        Json(SubmitReportRequest {
            remove_photo: true,
            ..open_request("Alpage")
        }),
    )
    .await
    .expect("modify");
    assert_eq!(removed.photo_ref, None);

    let Json(report) = get_own_report(
        State(fx.state.clone()),
        Path(created.report_id),
        actor(fx.inspector),
    )
    .await
    .expect("load");
    assert_eq!(report.trail, "Alpage");
    assert!(report.photo_ref.is_none());
}

#[tokio::test]
async fn other_inspector_cannot_load_or_modify() {
    let fx = setup().await;
    let created = submit(&fx, open_request("Sommet")).await;

    let (status, _) = get_own_report(
        State(fx.state.clone()),
        Path(created.report_id),
        actor(fx.other),
    )
    .await
    .expect_err("should fail");
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = modify_report(
        State(fx.state.clone()),
        Path(created.report_id),
        actor(fx.other),
        Json(open_request("Alpage")),
    )
    .await
    .expect_err("should fail");
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get_own_report(
        State(fx.state.clone()),
        Path(ReportId::generate()),
        actor(fx.inspector),
    )
    .await
    .expect_err("should fail");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_lists_own_reports_only() {
    let fx = setup().await;
    submit(&fx, open_request("Sommet")).await;
    submit(&fx, open_request("Alpage")).await;

    let Json(mine) = my_reports(State(fx.state.clone()), actor(fx.inspector))
        .await
        .expect("mine");
    let Json(theirs) = my_reports(State(fx.state.clone()), actor(fx.other))
        .await
        .expect("theirs");

    assert_eq!(mine.len(), 2);
    assert!(mine[0].label.contains("Alpage"));
    assert!(theirs.is_empty());
}

#[tokio::test]
async fn admin_routes_require_administrator() {
    let fx = setup().await;
    let created = submit(&fx, open_request("Sommet")).await;

    let (status, _) = admin_table(
        State(fx.state.clone()),
        Query(admin_query(fx.inspector)),
    )
    .await
    .expect_err("should fail");
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = admin_report_detail(
        State(fx.state.clone()),
        Path(created.report_id),
        actor(fx.inspector),
    )
    .await
    .expect_err("should fail");
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = triage_report(
        State(fx.state.clone()),
        Path(created.report_id),
        actor(fx.inspector),
        Json(TriageRequest {
            resolved: true,
            archived: false,
            admin_comments: None,
        }),
    )
    .await
    .expect_err("should fail");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_table_filters_by_sector_and_rejects_unknown_sector() {
    let fx = setup().await;
    submit(&fx, open_request("Sommet")).await;

    let Json(view) = admin_table(
        State(fx.state.clone()),
        Query(AdminTableQuery {
            sector: Some("giroux-nord".into()),
            ..admin_query(fx.admin)
        }),
    )
    .await
    .expect("table");
    assert!(matches!(view, TableView::Empty { .. }));

    let Json(view) = admin_table(
        State(fx.state.clone()),
        Query(AdminTableQuery {
            sector: Some(" ".into()),
            ..admin_query(fx.admin)
        }),
    )
    .await
    .expect("table");
    let TableView::Rows { rows } = view else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].inspector_name, "Julie Tremblay");

    let (status, _) = admin_table(
        State(fx.state.clone()),
        Query(AdminTableQuery {
            sector: Some("atlantide".into()),
            ..admin_query(fx.admin)
        }),
    )
    .await
    .expect_err("should fail");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn triage_hides_resolved_report_from_default_table() {
    let fx = setup().await;
    let created = submit(&fx, open_request("Sommet")).await;

    let Json(detail) = triage_report(
        State(fx.state.clone()),
        Path(created.report_id),
        actor(fx.admin),
        Json(TriageRequest {
            resolved: true,
            archived: false,
            admin_comments: Some("  Réparé  ".into()),
        }),
    )
    .await
    .expect("triage");
    assert!(detail.resolved);
    assert!(detail.resolved_at.is_some());
    assert_eq!(detail.admin_comments.as_deref(), Some("Réparé"));

    let (status, Html(html)) = admin_table_html(
        State(fx.state.clone()),
        Query(admin_query(fx.admin)),
    )
    .await
    .expect("html");
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Aucun rapport trouvé"));

    let Json(view) = admin_table(
        State(fx.state.clone()),
        Query(AdminTableQuery {
            show_resolved: true,
            ..admin_query(fx.admin)
        }),
    )
    .await
    .expect("table");
    assert!(matches!(view, TableView::Rows { .. }));

    let Json(detail) = admin_report_detail(
        State(fx.state.clone()),
        Path(created.report_id),
        actor(fx.admin),
    )
    .await
    .expect("detail");
    assert_eq!(detail.inspector_name, "Julie Tremblay");
    assert!(detail.admin_modified.is_some());
}
