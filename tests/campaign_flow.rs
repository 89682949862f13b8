//! End-to-end campaign runs against in-memory stores, a stub model and a
//! recording relay.

mod common;

use mail_parser::{MessageParser, MimeHeaders};

use common::{CSV, OWNER, StubLlm, World, credentials};
use outreach::attachments::load_dir;
use outreach::campaign::{CampaignState, StartRequest};
use outreach::contacts::ContactImporter;
use outreach::dispatch::build_message;
use outreach::error::{CampaignError, DispatchError};
use outreach::review::Reviewer;
use outreach::store::{ContactStore, TemplateStore};
use outreach::templates::{IMAGE_MARKER, NewTemplate};

const BODY: &str =
    "<p>Dear {Full Name} at {Company Name}</p>!!!IMAGE HERE---FIXED SIGNATURE---<p>Best, Al</p>";

async fn seed(world: &World, body: &str) -> StartRequest {
    let report = ContactImporter::new(world.store.clone())
        .import(OWNER, CSV.as_bytes())
        .await
        .unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.dropped_without_email, 1);

    let template = TemplateStore::create(
        world.store.as_ref(),
        OWNER,
        NewTemplate::new("Intro", "Hi {First Name}", body),
    )
    .await
    .unwrap();

    let contacts = ContactStore::list(world.store.as_ref(), OWNER).await.unwrap();
    StartRequest {
        contact_ids: contacts.iter().map(|c| c.id).collect(),
        template_id: Some(template.id),
        credentials: Some(credentials()),
        ..Default::default()
    }
}

#[tokio::test]
async fn full_run_with_inline_image_and_failed_send() {
    let world = World::new(StubLlm::default());
    let mut request = seed(&world, BODY).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cv.pdf"), b"%PDF-1.4 fake").unwrap();
    std::fs::write(dir.path().join("pic.png"), [0x89, b'P', b'N', b'G']).unwrap();
    let files = load_dir(world.store.as_ref(), OWNER, dir.path()).await.unwrap();
    let cv = files.iter().find(|a| a.file_name == "cv.pdf").unwrap();
    let pic = files.iter().find(|a| a.file_name == "pic.png").unwrap();
    request.attachment_ids = vec![cv.id];
    request.inline_image_id = Some(pic.id);

    let mut orch = world.orchestrator();
    let status = orch.start(request).await.unwrap();
    assert_eq!(status.state, CampaignState::AwaitingApproval(0));
    let draft = status.draft.unwrap();
    assert_eq!(draft.to, "sam@acme.io");
    assert!(draft.body.ends_with("<br>---<br><p>Best, Al</p>"));

    {
        let prompts = world.llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Sam Lee at Acme"));
        assert!(prompts[0].contains(IMAGE_MARKER));
        assert!(!prompts[0].contains("Best, Al"));
    }

    let status = orch.approve().await.unwrap();
    assert_eq!(status.state, CampaignState::AwaitingApproval(1));

    let email = world.relay.sent.lock().unwrap()[0].clone();
    assert_eq!(email.to, "sam@acme.io");
    assert_eq!(email.from_address, "al@example.com");
    assert!(!email.html.contains(IMAGE_MARKER));
    let cid = email
        .inline_parts()
        .next()
        .and_then(|p| p.content_id.clone())
        .unwrap();
    assert!(email.html.contains(&format!("src=\"cid:{cid}\"")));

    let raw = build_message(&email).unwrap().formatted();
    let parsed = MessageParser::default().parse(&raw[..]).unwrap();
    assert_eq!(parsed.subject(), Some("Quick hello"));
    assert!(parsed.body_html(0).unwrap().contains("cid:image-"));
    assert!(
        parsed
            .attachments()
            .any(|a| a.attachment_name() == Some("cv.pdf"))
    );
    assert!(parsed.parts.iter().any(|p| {
        p.content_id()
            .map(|id| id.trim_matches(|c| c == '<' || c == '>') == cid)
            .unwrap_or(false)
    }));

    // The relay rejects the second send once; approve again retries the same draft.
    *world.relay.fail_next.lock().unwrap() = true;
    let before = orch.status().draft.unwrap();
    let err = orch.approve().await.unwrap_err();
    assert!(matches!(err, CampaignError::Dispatch(DispatchError::Auth(_))));
    let status = orch.status();
    assert_eq!(status.state, CampaignState::AwaitingApproval(1));
    assert_eq!(status.draft.unwrap().id, before.id);

    let status = orch.approve().await.unwrap();
    assert_eq!(status.state, CampaignState::Done);

    let report = orch.last_report().unwrap();
    assert_eq!(report.counts.sent, 2);
    assert_eq!(report.counts.dispatch_failures, 1);
    assert_eq!(world.relay.sent.lock().unwrap()[1].to, "ria@beta.io");
}

#[tokio::test]
async fn unparseable_output_is_skipped_automatically() {
    let world = World::new(StubLlm::scripted(&["I'd rather not."]));
    let request = seed(&world, "<p>Hello {First Name}</p>").await;

    let mut orch = world.orchestrator();
    let status = orch.start(request).await.unwrap();
    assert_eq!(status.state, CampaignState::AwaitingApproval(1));
    assert_eq!(status.counts.generation_failed, 1);
    assert_eq!(status.recipient.unwrap().email, "ria@beta.io");
}

#[tokio::test]
async fn reimport_inserts_nothing() {
    let world = World::new(StubLlm::default());
    let importer = ContactImporter::new(world.store.clone());
    importer.import(OWNER, CSV.as_bytes()).await.unwrap();
    let again = importer.import(OWNER, CSV.as_bytes()).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.skipped_duplicates, 2);
}

#[tokio::test]
async fn reviewer_session_edits_and_sends() {
    let world = World::new(StubLlm::default());
    let request = seed(&world, "<p>Hello {First Name}</p>").await;
    let mut orch = world.orchestrator();
    orch.start(request).await.unwrap();

    let input = b"bogus\na\ne\nNew subject\n<p>Edited</p>\n.\na\n";
    let mut out = Vec::new();
    let report = Reviewer::new(&input[..], &mut out)
        .run(&mut orch)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.final_state, CampaignState::Done);
    assert_eq!(report.counts.sent, 2);

    let sent = world.relay.sent.lock().unwrap();
    assert_eq!(sent[1].subject, "New subject");
    assert_eq!(sent[1].html, "<p>Edited</p>");

    let transcript = String::from_utf8(out).unwrap();
    assert!(transcript.contains("Unknown command 'bogus'"));
    assert!(transcript.contains("To: sam@acme.io"));
    assert!(transcript.contains("Campaign done: 2 sent"));
}

#[tokio::test]
async fn reviewer_end_of_input_cancels() {
    let world = World::new(StubLlm::default());
    let request = seed(&world, "<p>Hello {First Name}</p>").await;
    let mut orch = world.orchestrator();
    orch.start(request).await.unwrap();

    let mut out = Vec::new();
    let report = Reviewer::new(&b"s\n"[..], &mut out)
        .run(&mut orch)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.final_state, CampaignState::Cancelled);
    assert_eq!(report.counts.skipped, 1);
    assert!(world.relay.sent.lock().unwrap().is_empty());
}
