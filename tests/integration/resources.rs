//! Integration tests for the resource controllers

use super::*;
use integrations_sendgrid::resources::*;
use integrations_sendgrid::SendGridErrorKind;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, method, path};
use wiremock::Mock;

// API keys

#[tokio::test]
async fn test_api_key_lifecycle_keeps_secret() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/v3/api_keys")
        .and(body_json(json!({"name": "k", "scopes": ["mail.send"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "api_key": "SG.abc",
            "api_key_id": "id1",
            "name": "k",
            "scopes": ["mail.send"]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("GET", "/v3/api_keys/id1")
        .respond_with(success_response(json!({
            "api_key_id": "id1",
            "name": "k",
            "scopes": ["mail.send"]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("PUT", "/v3/api_keys/id1")
        .and(body_json(json!({"name": "k-renamed", "scopes": []})))
        .respond_with(success_response(json!({
            "api_key_id": "id1",
            "name": "k-renamed",
            "scopes": ["mail.send", "alerts.read"]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let args = ApiKeyArgs {
        name: "k".to_string(),
        scopes: Some(vec!["mail.send".to_string()]),
    };

    let created = assert_ok!(ApiKey.create(Some(&client), &args, false).await);
    assert_eq!(created.id, "id1");
    assert_eq!(created.state.args.name, "k");
    assert_eq!(
        created.state.api_key.as_ref().map(|s| s.expose_secret().as_str()),
        Some("SG.abc")
    );

    let observed = assert_ok!(ApiKey.read(&client, "id1", &created.state).await).unwrap();
    assert_eq!(observed.args, args);
    assert_eq!(
        observed.state.api_key.as_ref().map(|s| s.expose_secret().as_str()),
        Some("SG.abc")
    );

    let renamed = ApiKeyArgs {
        name: "k-renamed".to_string(),
        scopes: None,
    };
    let updated = assert_ok!(
        ApiKey
            .update(Some(&client), "id1", &observed.state, &renamed, false)
            .await
    );
    assert_eq!(updated.args.name, "k-renamed");
    assert_eq!(updated.args.scopes.as_ref().map(Vec::len), Some(2));
    assert_eq!(
        updated.api_key.as_ref().map(|s| s.expose_secret().as_str()),
        Some("SG.abc")
    );
}

#[tokio::test]
async fn test_read_maps_not_found_to_absent() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/v3/api_keys/gone"))
        .respond_with(error_response(404, "resource not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = ApiKeyState {
        args: ApiKeyArgs {
            name: "old".to_string(),
            scopes: None,
        },
        api_key_id: "gone".to_string(),
        api_key: None,
    };

    let observed = assert_ok!(ApiKey.read(&client, "gone", &prior).await);
    assert!(observed.is_none());
}

#[tokio::test]
async fn test_read_wraps_other_errors() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .respond_with(error_response(403, "access forbidden"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = AlertState {
        args: AlertArgs {
            alert_type: AlertType::UsageLimit,
            email_to: "ops@example.com".to_string(),
            percentage: Some(90),
            frequency: None,
        },
        alert_id: 3,
        created_at: 0,
        updated_at: 0,
    };

    let err = assert_err!(Alert.read(&client, "3", &prior).await);
    assert_eq!(err.kind(), SendGridErrorKind::Forbidden);
    assert_eq!(err.message(), "failed to read alert: access forbidden");
}

#[tokio::test]
async fn test_delete_wraps_errors_with_context() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("DELETE"))
        .respond_with(error_response(500, "internal error"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let state = IpPoolState {
        args: IpPoolArgs {
            name: "marketing".to_string(),
        },
        pool_name: "marketing".to_string(),
        ips: Vec::new(),
    };

    let err = assert_err!(IpPool.delete(&client, "marketing", &state).await);
    assert_eq!(err.kind(), SendGridErrorKind::InternalError);
    assert!(err.message().starts_with("failed to delete IP pool: "));
}

// Templates

#[tokio::test]
async fn test_template_version_uses_parent_template_path() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/v3/templates/d-123/versions")
        .and(body_json(json!({
            "name": "v1",
            "subject": "Hello {{name}}",
            "html_content": "<p>Hi</p>",
            "active": 1
        })))
        .respond_with(success_response(json!({
            "id": "ver-1",
            "template_id": "d-123",
            "name": "v1",
            "subject": "Hello {{name}}",
            "html_content": "<p>Hi</p>",
            "plain_content": "Hi",
            "active": 1,
            "editor": "code",
            "generate_plain_content": true,
            "updated_at": "2024-01-01 00:00:00"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("DELETE", "/v3/templates/d-123/versions/ver-1")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let args = TemplateVersionArgs {
        template_id: "d-123".to_string(),
        name: "v1".to_string(),
        subject: Some("Hello {{name}}".to_string()),
        html_content: Some("<p>Hi</p>".to_string()),
        active: Some(1),
        ..Default::default()
    };

    let created = assert_ok!(TemplateVersion.create(Some(&client), &args, false).await);
    assert_eq!(created.id, "ver-1");
    assert_eq!(created.state.args.editor, Some(TemplateVersionEditor::Code));
    assert_eq!(created.state.args.plain_content.as_deref(), Some("Hi"));

    assert_ok!(TemplateVersion.delete(&client, "ver-1", &created.state).await);
}

#[tokio::test]
async fn test_template_update_sends_only_name() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("PATCH", "/v3/templates/d-1")
        .and(body_json(json!({"name": "Receipts"})))
        .respond_with(success_response(json!({
            "id": "d-1",
            "name": "Receipts",
            "generation": "dynamic",
            "updated_at": "2024-02-02 00:00:00",
            "versions": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = TemplateState {
        args: TemplateArgs {
            name: "Invoices".to_string(),
            generation: TemplateGeneration::Dynamic,
        },
        template_id: "d-1".to_string(),
        updated_at: None,
        versions: Vec::new(),
    };
    let args = TemplateArgs {
        name: "Receipts".to_string(),
        generation: TemplateGeneration::Dynamic,
    };

    let state = assert_ok!(Template.update(Some(&client), "d-1", &prior, &args, false).await);
    assert_eq!(state.args.name, "Receipts");
    assert_eq!(state.updated_at.as_deref(), Some("2024-02-02 00:00:00"));
}

#[tokio::test]
async fn test_template_version_move_is_rejected() {
    let mock_server = setup_mock_server().await;
    expect_no_requests(&mock_server).await;

    let client = test_client(&mock_server);
    let prior = TemplateVersionState {
        args: TemplateVersionArgs {
            template_id: "d-123".to_string(),
            name: "v1".to_string(),
            ..Default::default()
        },
        version_id: "ver-1".to_string(),
        updated_at: None,
        thumbnail_url: None,
    };
    let args = TemplateVersionArgs {
        template_id: "d-456".to_string(),
        ..prior.args.clone()
    };

    let err = assert_err!(
        TemplateVersion
            .update(Some(&client), "ver-1", &prior, &args, false)
            .await
    );
    assert_eq!(err.kind(), SendGridErrorKind::UnsupportedOperation);
}

// Verified senders

fn sender_state(id: i64) -> VerifiedSenderState {
    VerifiedSenderState {
        args: VerifiedSenderArgs {
            nickname: "Support".to_string(),
            from_email: "support@example.com".to_string(),
            reply_to: "support@example.com".to_string(),
            address: "1 Main St".to_string(),
            city: "Denver".to_string(),
            country: "USA".to_string(),
            ..Default::default()
        },
        sender_id: id,
        verified: false,
        locked: false,
    }
}

#[tokio::test]
async fn test_verified_sender_read_scans_list() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("GET", "/v3/verified_senders")
        .respond_with(success_response(json!({
            "results": [
                {"id": 1, "nickname": "Other", "from_email": "other@example.com"},
                {
                    "id": 7,
                    "nickname": "Support",
                    "from_email": "support@example.com",
                    "from_name": "",
                    "reply_to": "support@example.com",
                    "address": "1 Main St",
                    "city": "Denver",
                    "zip": "80202",
                    "country": "USA",
                    "verified": true,
                    "locked": false
                }
            ]
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);

    let observed = assert_ok!(VerifiedSender.read(&client, "7", &sender_state(7)).await).unwrap();
    assert_eq!(observed.state.sender_id, 7);
    assert!(observed.state.verified);
    assert_eq!(observed.args.from_name, None);
    assert_eq!(observed.args.zip.as_deref(), Some("80202"));

    let missing = assert_ok!(VerifiedSender.read(&client, "99", &sender_state(99)).await);
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_verified_sender_rejects_bad_id_before_request() {
    let mock_server = setup_mock_server().await;
    expect_no_requests(&mock_server).await;

    let client = test_client(&mock_server);
    let err = assert_err!(VerifiedSender.read(&client, "abc", &sender_state(0)).await);
    assert_eq!(err.kind(), SendGridErrorKind::InvalidArgument);
}

// Domain and link branding

#[tokio::test]
async fn test_domain_authentication_carries_creation_only_fields() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("PATCH", "/v3/whitelabel/domains/42")
        .and(body_json(json!({"default": true})))
        .respond_with(success_response(json!({
            "id": 42,
            "user_id": 7,
            "domain": "example.com",
            "username": "owner",
            "default": true,
            "valid": true,
            "dns": {
                "mail_cname": {"valid": true, "type": "cname", "host": "em.example.com", "data": "u7.wl.sendgrid.net"}
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = DomainAuthenticationState {
        args: DomainAuthenticationArgs {
            domain: "example.com".to_string(),
            custom_dkim_selector: Some("s1".to_string()),
            region: Some("eu".to_string()),
            ..Default::default()
        },
        domain_id: 42,
        user_id: 7,
        username: "owner".to_string(),
        valid: false,
        legacy: false,
        mail_cname: None,
        dkim1: None,
        dkim2: None,
    };
    let args = DomainAuthenticationArgs {
        default: Some(true),
        ..prior.args.clone()
    };

    let state = assert_ok!(
        DomainAuthentication
            .update(Some(&client), "42", &prior, &args, false)
            .await
    );
    assert_eq!(state.args.default, Some(true));
    assert_eq!(state.args.custom_dkim_selector.as_deref(), Some("s1"));
    assert_eq!(state.args.region.as_deref(), Some("eu"));
    assert!(state.valid);
    assert_eq!(state.mail_cname.unwrap().host, "em.example.com");
}

#[tokio::test]
async fn test_link_branding_create() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/v3/whitelabel/links")
        .and(body_json(json!({"domain": "example.com", "subdomain": "links"})))
        .respond_with(success_response(json!({
            "id": 12,
            "user_id": 7,
            "domain": "example.com",
            "subdomain": "links",
            "username": "owner",
            "default": false,
            "valid": false,
            "legacy": false,
            "dns": {
                "owner_cname": {"valid": false, "type": "cname", "host": "7.example.com", "data": "sendgrid.net"},
                "brand_cname": {"valid": false, "type": "cname", "host": "links.example.com", "data": "sendgrid.net"}
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let args = LinkBrandingArgs {
        domain: "example.com".to_string(),
        subdomain: Some("links".to_string()),
        ..Default::default()
    };

    let created = assert_ok!(LinkBranding.create(Some(&client), &args, false).await);
    assert_eq!(created.id, "12");
    assert_eq!(created.state.args.default, None);
    assert_eq!(created.state.brand_cname.unwrap().host, "links.example.com");
}

// IP pools

#[tokio::test]
async fn test_ip_pool_rename_uses_encoded_old_name() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("PUT", "/v3/ips/pools/old%20pool")
        .and(body_json(json!({"name": "new-pool"})))
        .respond_with(success_response(json!({"name": "new-pool"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = IpPoolState {
        args: IpPoolArgs {
            name: "old pool".to_string(),
        },
        pool_name: "old pool".to_string(),
        ips: vec!["10.0.0.1".to_string()],
    };
    let args = IpPoolArgs {
        name: "new-pool".to_string(),
    };

    let state = assert_ok!(IpPool.update(Some(&client), "old pool", &prior, &args, false).await);
    assert_eq!(state.pool_name, "new-pool");
    assert_eq!(state.ips, vec!["10.0.0.1".to_string()]);
}

#[tokio::test]
async fn test_ip_pool_read_after_rename_follows_new_name() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("PUT", "/v3/ips/pools/old")
        .and(body_json(json!({"name": "new"})))
        .respond_with(success_response(json!({"name": "new"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("GET", "/v3/ips/pools/new")
        .respond_with(success_response(json!({"pool_name": "new", "ips": ["10.0.0.9"]})))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("DELETE", "/v3/ips/pools/new")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = IpPoolState {
        args: IpPoolArgs {
            name: "old".to_string(),
        },
        pool_name: "old".to_string(),
        ips: Vec::new(),
    };
    let args = IpPoolArgs {
        name: "new".to_string(),
    };

    // The orchestrator keeps addressing the pool by its original id.
    let renamed = assert_ok!(IpPool.update(Some(&client), "old", &prior, &args, false).await);
    let observed = assert_ok!(IpPool.read(&client, "old", &renamed).await).unwrap();
    assert_eq!(observed.id, "old");
    assert_eq!(observed.state.pool_name, "new");
    assert_eq!(observed.state.ips, vec!["10.0.0.9".to_string()]);

    assert_ok!(IpPool.delete(&client, "old", &observed.state).await);
}

// Unsubscribe groups

#[tokio::test]
async fn test_unsubscribe_group_shaping() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/v3/asm/groups")
        .and(body_json(json!({"name": "Newsletters", "description": ""})))
        .respond_with(success_response(json!({
            "id": 5,
            "name": "Newsletters",
            "description": "",
            "is_default": false,
            "unsubscribes": 0
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("PATCH", "/v3/asm/groups/5")
        .and(body_json(json!({"name": "Weekly", "description": "Weekly digest"})))
        .respond_with(success_response(json!({
            "id": 5,
            "name": "Weekly",
            "description": "Weekly digest",
            "is_default": false,
            "unsubscribes": 3
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let args = UnsubscribeGroupArgs {
        name: "Newsletters".to_string(),
        description: Some(String::new()),
        is_default: None,
    };

    let created = assert_ok!(UnsubscribeGroup.create(Some(&client), &args, false).await);
    assert_eq!(created.id, "5");
    assert_eq!(created.state.args.description, None);
    assert_eq!(created.state.args.is_default, Some(false));

    let wanted = UnsubscribeGroupArgs {
        name: "Weekly".to_string(),
        description: Some("Weekly digest".to_string()),
        is_default: Some(true),
    };
    let updated = assert_ok!(
        UnsubscribeGroup
            .update(Some(&client), "5", &created.state, &wanted, false)
            .await
    );
    assert_eq!(updated.args.description.as_deref(), Some("Weekly digest"));
    // is_default is never sent on PATCH, so the remote value is reported.
    assert_eq!(updated.args.is_default, Some(false));
    assert_eq!(updated.unsubscribes, 3);
}

// Global suppressions

#[tokio::test]
async fn test_global_suppression_create_verifies_response() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/v3/asm/suppressions/global")
        .and(body_json(json!({"recipient_emails": ["blocked@example.com"]})))
        .respond_with(success_response(json!({"recipient_emails": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let args = GlobalSuppressionArgs {
        email: "blocked@example.com".to_string(),
    };

    let err = assert_err!(GlobalSuppression.create(Some(&client), &args, false).await);
    assert_eq!(err.kind(), SendGridErrorKind::UnexpectedResponse);
    assert_eq!(err.message(), "email was not added to global suppression list");
}

#[tokio::test]
async fn test_global_suppression_read_encodes_email() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("GET", "/v3/asm/suppressions/global/user%2Btag%40example.com")
        .respond_with(success_response(json!({"recipient_email": "user+tag@example.com"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("GET", "/v3/asm/suppressions/global/free%40example.com")
        .respond_with(success_response(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = GlobalSuppressionState {
        args: GlobalSuppressionArgs {
            email: "user+tag@example.com".to_string(),
        },
        created_at: 0,
    };

    let observed = assert_ok!(
        GlobalSuppression
            .read(&client, "user+tag@example.com", &prior)
            .await
    )
    .unwrap();
    assert_eq!(observed.args.email, "user+tag@example.com");

    let missing = assert_ok!(GlobalSuppression.read(&client, "free@example.com", &prior).await);
    assert!(missing.is_none());
}

// Event webhooks

#[tokio::test]
async fn test_event_webhook_create_defaults_enabled() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/v3/user/webhooks/event/settings")
        .and(body_json(json!({
            "url": "https://hooks.example.com/sg",
            "enabled": true,
            "friendly_name": "main",
            "delivered": true
        })))
        .respond_with(success_response(json!({
            "id": "wh-9",
            "url": "https://hooks.example.com/sg",
            "enabled": true,
            "friendly_name": "main",
            "delivered": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let args = EventWebhookArgs {
        url: "https://hooks.example.com/sg".to_string(),
        friendly_name: Some("main".to_string()),
        delivered: Some(true),
        ..Default::default()
    };

    let created = assert_ok!(EventWebhook.create(Some(&client), &args, false).await);
    assert_eq!(created.id, "wh-9");
    assert_eq!(created.state.args.delivered, Some(true));
    assert_eq!(created.state.args.bounce, Some(false));
}

// Subusers

fn subuser_args(disabled: Option<bool>, ips: Option<Vec<String>>) -> SubuserArgs {
    SubuserArgs {
        username: "marketing".to_string(),
        email: "marketing@example.com".to_string(),
        password: SecretString::new("Sup3r-secret".to_string()),
        ips,
        region: None,
        disabled,
    }
}

#[tokio::test]
async fn test_subuser_create_disabled_failure_names_step() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/v3/subusers")
        .and(body_json(json!({
            "username": "marketing",
            "email": "marketing@example.com",
            "password": "Sup3r-secret"
        })))
        .respond_with(success_response(json!({
            "user_id": 1001,
            "username": "marketing",
            "email": "marketing@example.com"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("PATCH", "/v3/subusers/marketing")
        .and(body_json(json!({"disabled": true})))
        .respond_with(error_response(500, "internal error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = assert_err!(
        Subuser
            .create(Some(&client), &subuser_args(Some(true), None), false)
            .await
    );
    assert!(err
        .message()
        .starts_with("subuser created but failed to disable: "));
}

#[tokio::test]
async fn test_subuser_update_runs_each_step() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("PATCH", "/v3/subusers/marketing")
        .and(body_json(json!({"disabled": true})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("PUT", "/v3/subusers/marketing/ips")
        .and(body_json(json!({"ips": ["10.0.0.2"]})))
        .respond_with(error_response(400, "invalid ip"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = SubuserState {
        args: subuser_args(Some(false), Some(vec!["10.0.0.1".to_string()])),
        user_id: 1001,
    };
    let args = subuser_args(Some(true), Some(vec!["10.0.0.2".to_string()]));

    let err = assert_err!(
        Subuser
            .update(Some(&client), "marketing", &prior, &args, false)
            .await
    );
    assert_eq!(err.kind(), SendGridErrorKind::BadRequest);
    assert_eq!(err.message(), "failed to update subuser IPs: invalid ip");
}

#[tokio::test]
async fn test_subuser_update_skips_unchanged_steps() {
    let mock_server = setup_mock_server().await;
    expect_no_requests(&mock_server).await;

    let client = test_client(&mock_server);
    let prior = SubuserState {
        args: subuser_args(Some(false), Some(vec!["10.0.0.1".to_string()])),
        user_id: 1001,
    };
    let args = subuser_args(Some(false), Some(vec!["10.0.0.1".to_string()]));

    let state = assert_ok!(
        Subuser
            .update(Some(&client), "marketing", &prior, &args, false)
            .await
    );
    assert_eq!(state.user_id, 1001);
    assert_eq!(state.args.password.expose_secret(), "Sup3r-secret");
}

#[tokio::test]
async fn test_subuser_read_carries_unreported_fields() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("GET", "/v3/subusers/marketing")
        .respond_with(success_response(json!({
            "id": 1001,
            "username": "marketing",
            "email": "marketing@example.com",
            "disabled": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = SubuserState {
        args: SubuserArgs {
            region: Some("eu".to_string()),
            ..subuser_args(None, Some(vec!["10.0.0.1".to_string()]))
        },
        user_id: 1001,
    };

    let observed = assert_ok!(Subuser.read(&client, "marketing", &prior).await).unwrap();
    assert_eq!(observed.args.disabled, Some(true));
    assert_eq!(observed.args.region.as_deref(), Some("eu"));
    assert_eq!(observed.args.ips, Some(vec!["10.0.0.1".to_string()]));
    assert_eq!(observed.args.password.expose_secret(), "Sup3r-secret");
}

#[tokio::test]
async fn test_subuser_username_change_is_rejected() {
    let mock_server = setup_mock_server().await;
    expect_no_requests(&mock_server).await;

    let client = test_client(&mock_server);
    let prior = SubuserState {
        args: subuser_args(Some(false), None),
        user_id: 1001,
    };
    let args = SubuserArgs {
        username: "marketing-eu".to_string(),
        ..subuser_args(Some(true), None)
    };

    let err = assert_err!(
        Subuser
            .update(Some(&client), "marketing", &prior, &args, false)
            .await
    );
    assert_eq!(err.kind(), SendGridErrorKind::UnsupportedOperation);
    assert!(err.message().starts_with("subuser username and email cannot be changed"));
}

// Teammates

fn pending_teammate() -> TeammateState {
    TeammateState {
        args: TeammateArgs {
            email: "new@example.com".to_string(),
            scopes: None,
            is_admin: Some(false),
        },
        token: Some("tok-1".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_teammate_read_falls_through_pending_to_accepted() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("GET", "/v3/teammates/pending")
        .respond_with(success_response(json!({
            "result": [{"email": "someone@example.com", "token": "tok-0", "is_admin": false}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("GET", "/v3/teammates")
        .respond_with(success_response(json!({
            "result": [{
                "username": "newbie",
                "email": "new@example.com",
                "first_name": "New",
                "last_name": "Person",
                "user_type": "teammate",
                "is_admin": false,
                "scopes": ["mail.send"]
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let observed = assert_ok!(
        Teammate
            .read(&client, "new@example.com", &pending_teammate())
            .await
    )
    .unwrap();

    assert_eq!(observed.state.username.as_deref(), Some("newbie"));
    assert_eq!(observed.state.user_type.as_deref(), Some("teammate"));
    assert_eq!(observed.state.token, None);
    assert_eq!(observed.args.scopes, Some(vec!["mail.send".to_string()]));
}

#[tokio::test]
async fn test_teammate_read_by_username() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("GET", "/v3/teammates/newbie")
        .respond_with(error_response(404, "not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = TeammateState {
        username: Some("newbie".to_string()),
        token: None,
        ..pending_teammate()
    };

    let observed = assert_ok!(Teammate.read(&client, "new@example.com", &prior).await);
    assert!(observed.is_none());
}

#[tokio::test]
async fn test_pending_teammate_update_is_rejected() {
    let mock_server = setup_mock_server().await;
    expect_no_requests(&mock_server).await;

    let client = test_client(&mock_server);
    let prior = pending_teammate();
    let args = TeammateArgs {
        is_admin: Some(true),
        ..prior.args.clone()
    };

    let err = assert_err!(
        Teammate
            .update(Some(&client), "new@example.com", &prior, &args, false)
            .await
    );
    assert_eq!(err.kind(), SendGridErrorKind::UnsupportedOperation);
    assert!(err.message().starts_with("pending teammate invitations cannot be updated"));

    // Nothing to change is not an error.
    let state = assert_ok!(
        Teammate
            .update(Some(&client), "new@example.com", &prior, &prior.args, false)
            .await
    );
    assert_eq!(state, prior);
}

#[tokio::test]
async fn test_teammate_email_change_is_rejected() {
    let mock_server = setup_mock_server().await;
    expect_no_requests(&mock_server).await;

    let client = test_client(&mock_server);
    let prior = TeammateState {
        username: Some("newbie".to_string()),
        token: None,
        ..pending_teammate()
    };
    let args = TeammateArgs {
        email: "renamed@example.com".to_string(),
        ..prior.args.clone()
    };

    let err = assert_err!(
        Teammate
            .update(Some(&client), "new@example.com", &prior, &args, false)
            .await
    );
    assert_eq!(err.kind(), SendGridErrorKind::UnsupportedOperation);
}

#[tokio::test]
async fn test_pending_teammate_delete_uses_token() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("DELETE", "/v3/teammates/pending/tok-1")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    assert_ok!(
        Teammate
            .delete(&client, "new@example.com", &pending_teammate())
            .await
    );
}

// Alerts

#[tokio::test]
async fn test_alert_update_validates_before_request() {
    let mock_server = setup_mock_server().await;
    expect_no_requests(&mock_server).await;

    let client = test_client(&mock_server);
    let prior = AlertState {
        args: AlertArgs {
            alert_type: AlertType::StatsNotification,
            email_to: "ops@example.com".to_string(),
            percentage: None,
            frequency: Some("daily".to_string()),
        },
        alert_id: 4,
        created_at: 1,
        updated_at: 1,
    };
    let args = AlertArgs {
        frequency: None,
        ..prior.args.clone()
    };

    let err = assert_err!(Alert.update(Some(&client), "4", &prior, &args, false).await);
    assert_eq!(err.kind(), SendGridErrorKind::InvalidArgument);
    assert_eq!(err.message(), "frequency is required for stats_notification alerts");
}

#[tokio::test]
async fn test_alert_update_body_omits_type() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("PATCH", "/v3/alerts/4")
        .and(body_json(json!({"email_to": "oncall@example.com", "percentage": 80})))
        .respond_with(success_response(json!({
            "id": 4,
            "type": "usage_limit",
            "email_to": "oncall@example.com",
            "percentage": 80,
            "created_at": 1,
            "updated_at": 2
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let prior = AlertState {
        args: AlertArgs {
            alert_type: AlertType::UsageLimit,
            email_to: "ops@example.com".to_string(),
            percentage: Some(90),
            frequency: None,
        },
        alert_id: 4,
        created_at: 1,
        updated_at: 1,
    };
    let args = AlertArgs {
        email_to: "oncall@example.com".to_string(),
        percentage: Some(80),
        ..prior.args.clone()
    };

    let state = assert_ok!(Alert.update(Some(&client), "4", &prior, &args, false).await);
    assert_eq!(state.args.percentage, Some(80));
    assert_eq!(state.updated_at, 2);
}
