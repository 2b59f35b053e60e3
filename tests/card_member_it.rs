// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::macros::date;
// self
use wechat_broker::{
	_preludet::*,
	auth::{AppId, OpenId},
	card::{CUSTOM_FIELD_PLACEHOLDER, Gender, MemberCardStatus},
	config::{CachePolicy, ClientConfig},
	error::ConfigError,
	flows::{ActivationRequest, ReqwestApiClient},
};

const MEMBER_PAYLOAD: &str = r#"{
	"errcode": 0,
	"errmsg": "ok",
	"openid": "oMember",
	"nickname": "Alice",
	"membership_number": "0001",
	"bonus": 10,
	"sex": "FEMALE",
	"user_info": {
		"common_field_list": [
			{"name": "USER_FORM_INFO_FLAG_MOBILE", "value": "13800000000"},
			{"name": "USER_FORM_INFO_FLAG_SEX", "value": "FEMALE"},
			{"name": "USER_FORM_INFO_FLAG_NAME", "value": "Li Hua"},
			{"name": "USER_FORM_INFO_FLAG_BIRTHDAY", "value": "1992-7-9"},
			{"name": "USER_FORM_INFO_FLAG_EMAIL", "value": "a@example.com"}
		],
		"custom_field_list": [
			{"name": "大宝生日", "value": "2018"}
		]
	},
	"user_card_status": "NORMAL",
	"has_active": true
}"#;

async fn client(server: &MockServer) -> ReqwestApiClient {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"T","expires_in":7200}"#);
		})
		.await;

	let config = mock_config_builder(&server.base_url())
		.expect("Mock configuration builder should be created.")
		.cache_policy(CachePolicy::Autonomous)
		.build()
		.expect("Mock configuration should build.");

	build_reqwest_test_client(config).await.expect("Client should start.")
}

async fn mock_member<'a>(server: &'a MockServer, code: &str, body: &'static str) -> httpmock::Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/card/membercard/userinfo/get")
				.query_param("access_token", "T")
				.json_body(json!({"card_id": TEST_CARD_ID, "code": code}));
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

async fn mock_card_list<'a>(server: &'a MockServer, body: &'static str) -> httpmock::Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/card/user/getcardlist")
				.query_param("access_token", "T")
				.json_body(json!({"card_id": TEST_CARD_ID, "openid": "oMember"}));
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

fn member() -> OpenId {
	OpenId::new("oMember").expect("Open identifier should be valid.")
}

#[tokio::test]
async fn member_by_code_normalizes_fields() {
	let server = MockServer::start_async().await;
	let client = client(&server).await;
	let mock = mock_member(&server, "0001", MEMBER_PAYLOAD).await;
	let record = client.member_by_code("0001").await.expect("Member lookup should succeed.");

	mock.assert_async().await;

	assert_eq!(record.card_id.as_ref(), TEST_CARD_ID);
	assert_eq!(record.open_id, member());
	assert_eq!(record.card_code, "0001");
	assert_eq!(record.nickname, "Alice");
	assert_eq!(record.mobile, "13800000000");
	assert_eq!(record.gender, Gender::Female);
	assert_eq!(record.real_name, "Li Hua");
	assert_eq!(record.birthday, date!(1992 - 07 - 09));
	assert_eq!(record.status, MemberCardStatus::Normal);
	assert_eq!(record.custom_field1, "2018");
	assert_eq!(record.custom_field2, CUSTOM_FIELD_PLACEHOLDER);
}

#[tokio::test]
async fn inactive_card_is_reported() {
	let server = MockServer::start_async().await;
	let client = client(&server).await;
	let _mock =
		mock_member(&server, "0002", r#"{"errcode":0,"openid":"oMember","has_active":false}"#)
			.await;
	let err = client.member_by_code("0002").await.expect_err("Inactive card should fail.");

	assert!(matches!(err, Error::CardNotActivated));
}

#[tokio::test]
async fn member_by_open_id_matches_card_case_insensitively() {
	let server = MockServer::start_async().await;
	let client = client(&server).await;
	let list = mock_card_list(
		&server,
		r#"{"errcode":0,"card_list":[{"card_id":"pCoupon","code":"9"},{"card_id":"PTESTMEMBERCARD","code":"0001"}],"has_share_card":false}"#,
	)
	.await;
	let detail = mock_member(&server, "0001", MEMBER_PAYLOAD).await;
	let record = client.member_by_open_id(&member()).await.expect("Lookup should succeed.");

	list.assert_async().await;
	detail.assert_async().await;

	assert_eq!(record.card_code, "0001");
}

#[tokio::test]
async fn member_by_open_id_distinguishes_missing_and_foreign_cards() {
	let server = MockServer::start_async().await;
	let client = client(&server).await;
	let mut empty = mock_card_list(&server, r#"{"errcode":0,"card_list":[]}"#).await;
	let err = client.member_by_open_id(&member()).await.expect_err("No cards should fail.");

	assert!(matches!(err, Error::CardNotFound { ref open_id } if open_id == "oMember"));

	empty.delete_async().await;

	let _foreign =
		mock_card_list(&server, r#"{"errcode":0,"card_list":[{"card_id":"pCoupon","code":"9"}]}"#)
			.await;
	let err = client.member_by_open_id(&member()).await.expect_err("Foreign cards should fail.");

	assert!(matches!(err, Error::NotCardMember { .. }));
}

#[tokio::test]
async fn activation_runs_every_step_and_falls_back_to_profile_gender() {
	let server = MockServer::start_async().await;
	let client = client(&server).await;
	let form = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/card/membercard/activatetempinfo/get")
				.query_param("access_token", "T")
				.json_body(json!({"activate_ticket": "ticket"}));
			then.status(200).header("content-type", "application/json").body(
				r#"{"errcode":0,"info":{"common_field_list":[
					{"name":"USER_FORM_INFO_FLAG_MOBILE","value":"13900000000"},
					{"name":"USER_FORM_INFO_FLAG_BIRTHDAY","value":"0001-01-01"}
				],"custom_field_list":[{"name":"二宝生日","value":"2021"}]}}"#,
			);
		})
		.await;
	let decrypt = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/card/code/decrypt")
				.json_body(json!({"encrypt_code": "encrypted"}));
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"errcode":0,"errmsg":"ok","code":"778899"}"#);
		})
		.await;
	let activate = server
		.mock_async(|when, then| {
			when.method(POST).path("/card/membercard/activate").json_body(json!({
				"membership_number": "778899",
				"code": "778899",
				"card_id": TEST_CARD_ID,
			}));
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"errcode":0,"errmsg":"ok"}"#);
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/user/info").query_param("openid", "oMember");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"subscribe":1,"openid":"oMember","nickname":"Bob","sex":1,"unionid":"uBob"}"#);
		})
		.await;
	let request = ActivationRequest {
		encrypt_code: "encrypted".into(),
		open_id: member(),
		activate_ticket: "ticket".into(),
	};
	let record = client.activate_member(&request).await.expect("Activation should succeed.");

	form.assert_async().await;
	decrypt.assert_async().await;
	activate.assert_async().await;
	profile.assert_async().await;

	assert_eq!(record.card_code, "778899");
	assert_eq!(record.mobile, "13900000000");
	assert_eq!(record.gender, Gender::Male);
	assert_eq!(record.nickname, "Bob");
	assert_eq!(record.union_id, "uBob");
	assert_eq!(record.status, MemberCardStatus::Normal);
	assert_eq!(record.custom_field2, "2021");
	assert!(record.birthday >= date!(2024 - 01 - 01), "unset birthday should mean today");
}

#[tokio::test]
async fn activation_stops_at_first_failing_step() {
	let server = MockServer::start_async().await;
	let client = client(&server).await;
	let _form = server
		.mock_async(|when, then| {
			when.method(POST).path("/card/membercard/activatetempinfo/get");
			then.status(200).header("content-type", "application/json").body(r#"{"errcode":0,"info":{}}"#);
		})
		.await;
	let _decrypt = server
		.mock_async(|when, then| {
			when.method(POST).path("/card/code/decrypt");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"errcode":40056,"errmsg":"invalid serial code"}"#);
		})
		.await;
	let activate = server
		.mock_async(|when, then| {
			when.method(POST).path("/card/membercard/activate");
			then.status(200).body(r#"{"errcode":0}"#);
		})
		.await;
	let request = ActivationRequest {
		encrypt_code: "broken".into(),
		open_id: member(),
		activate_ticket: "ticket".into(),
	};
	let err = client.activate_member(&request).await.expect_err("Decrypt failure should stop.");

	activate.assert_calls_async(0).await;

	assert!(matches!(err, Error::Api { code: 40056, .. }));
}

#[tokio::test]
async fn card_operations_require_configured_card() {
	let server = MockServer::start_async().await;
	let config = ClientConfig::builder(
		AppId::new(TEST_APP_ID).expect("App identifier should be valid."),
		TEST_APP_SECRET,
	)
	.api_endpoint(Url::parse(&server.base_url()).expect("Mock base should parse."))
	.build()
	.expect("Configuration should build.");
	let client = build_reqwest_test_client(config).await.expect("Client should build.");
	let err = client.member_by_code("0001").await.expect_err("Missing card id should fail.");

	assert!(matches!(err, Error::Config(ConfigError::MissingCardId)));
}
