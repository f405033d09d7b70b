// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Façade tests against the in-memory address space in `common`.
//!
//! # Running the Tests
//!
//! ```bash
//! cargo test -p twin-opcua --test node_services
//! ```

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{address, ctx, ids, services, MockTransport, SENSOR_COUNT};

use twin_opcua::diagnostics::Diagnostics;
use twin_opcua::error::status_codes;
use twin_opcua::types::well_known;
use twin_opcua::{
    AttributeId, AttributeReadItem, AttributeWriteItem, BrowseNextRequest, BrowsePathRequest,
    BrowseRequest, CancelToken, DiagnosticsLevel, DynamicValue, FacadeConfig, MethodCallArgument,
    MethodCallRequest, MethodMetadataRequest, NodeClass, NodeServices, ReadRequest, RequestHeader,
    Scalar, SessionContext, ValueReadRequest, ValueWriteRequest, Variant, WriteRequest,
};

fn browse_of(node_id: &twin_opcua::NodeId) -> BrowseRequest {
    BrowseRequest {
        node_id: Some(address(node_id)),
        ..Default::default()
    }
}

fn status_of(error_info: &Option<twin_opcua::ServiceResult>) -> u32 {
    error_info.as_ref().map(|e| e.status_code).unwrap_or(status_codes::GOOD)
}

fn path(elements: &[&str]) -> Vec<String> {
    elements.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Browse
// =============================================================================

#[tokio::test]
async fn test_root_browse_lists_standard_folders() {
    let (_mock, services) = services();

    let response = services.browse_first(&ctx(), BrowseRequest::default()).await.unwrap();

    assert!(response.error_info.is_none());
    assert_eq!(response.node.node_id, address(&well_known::ROOT_FOLDER));
    assert_eq!(response.node.node_class, Some(NodeClass::Object));
    assert_eq!(response.node.has_children, Some(true));
    assert!(response.continuation_token.is_none());

    let summary: Vec<(Option<String>, Option<bool>)> = response
        .references
        .iter()
        .map(|r| (r.target.display_name.clone(), r.target.has_children))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Some("Objects".to_string()), Some(true)),
            (Some("Types".to_string()), Some(true)),
            (Some("Views".to_string()), Some(false)),
        ]
    );
    for reference in &response.references {
        assert_eq!(reference.direction, Some(twin_opcua::BrowseDirection::Forward));
        assert_eq!(reference.reference_type_id.as_deref(), Some("i=35"));
        assert_eq!(reference.target.type_definition_id.as_deref(), Some("i=61"));
    }
}

#[tokio::test]
async fn test_browse_paging_yields_each_reference_once() {
    let (mock, services) = services();
    let request = BrowseRequest {
        max_references: Some(2),
        ..browse_of(&ids::sensors())
    };

    let first = services.browse_first(&ctx(), request).await.unwrap();
    let mut seen: Vec<String> = first.references.iter().map(|r| r.target.node_id.clone()).collect();
    let mut token = first.continuation_token;
    let mut pages = 1;

    while let Some(current) = token {
        let next = services
            .browse_next(
                &ctx(),
                BrowseNextRequest {
                    continuation_token: current.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(next.error_info.is_none());
        seen.extend(next.references.iter().map(|r| r.target.node_id.clone()));
        token = next.continuation_token;
        pages += 1;
    }

    let expected: Vec<String> = (0..SENSOR_COUNT).map(|i| address(&ids::sensor(i))).collect();
    assert_eq!(seen, expected);
    assert_eq!(pages, 3);
    assert_eq!(mock.open_cursors(), 0);
}

#[tokio::test]
async fn test_smaller_page_is_prefix_of_larger_page() {
    let (_mock, services) = services();

    let one = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                max_references: Some(1),
                ..browse_of(&ids::sensors())
            },
        )
        .await
        .unwrap();
    let two = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                max_references: Some(2),
                ..browse_of(&ids::sensors())
            },
        )
        .await
        .unwrap();

    assert_eq!(one.references.len(), 1);
    assert_eq!(two.references.len(), 2);
    assert_eq!(one.references[0], two.references[0]);
    assert!(one.continuation_token.is_some());
    assert!(two.continuation_token.is_some());
}

#[tokio::test]
async fn test_browse_next_abort_releases_cursor() {
    let (mock, services) = services();
    let first = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                max_references: Some(1),
                ..browse_of(&ids::sensors())
            },
        )
        .await
        .unwrap();
    let token = first.continuation_token.unwrap();
    let released = mock.released_cursors.load(Ordering::SeqCst);

    let aborted = services
        .browse_next(
            &ctx(),
            BrowseNextRequest {
                continuation_token: token.to_string(),
                abort: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(aborted.error_info.is_none());
    assert!(aborted.references.is_empty());
    assert!(aborted.continuation_token.is_none());
    assert_eq!(mock.released_cursors.load(Ordering::SeqCst), released + 1);
    assert_eq!(mock.open_cursors(), 0);

    // The released cursor is gone for good
    let reused = services
        .browse_next(
            &ctx(),
            BrowseNextRequest {
                continuation_token: token.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(status_of(&reused.error_info), status_codes::BAD_CONTINUATION_POINT_INVALID);
}

#[tokio::test]
async fn test_malformed_continuation_token() {
    let (mock, services) = services();

    let response = services
        .browse_next(
            &ctx(),
            BrowseNextRequest {
                continuation_token: "not a token!".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(status_of(&response.error_info), status_codes::BAD_CONTINUATION_POINT_INVALID);
    assert_eq!(mock.browse_next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_class_filter_applies_after_fetch() {
    let (_mock, services) = services();

    let methods = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                node_class_filter: vec![NodeClass::Method],
                ..browse_of(&ids::boiler())
            },
        )
        .await
        .unwrap();
    assert_eq!(methods.references.len(), 1);
    assert_eq!(methods.references[0].target.node_id, address(&ids::reset()));

    // A page of filtered-out references is empty but not exhausted
    let paged = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                node_class_filter: vec![NodeClass::Method],
                max_references: Some(2),
                ..browse_of(&ids::boiler())
            },
        )
        .await
        .unwrap();
    assert!(paged.references.is_empty());
    assert!(paged.continuation_token.is_some());
}

#[tokio::test]
async fn test_look_ahead_failure_degrades_to_unknown() {
    let (mock, services) = services();
    mock.fail_browse_of(&ids::sensors());

    let response = services
        .browse_first(&ctx(), browse_of(&well_known::OBJECTS_FOLDER))
        .await
        .unwrap();

    assert!(response.error_info.is_none());
    let by_id = |id: &twin_opcua::NodeId| {
        response
            .references
            .iter()
            .find(|r| r.target.node_id == address(id))
            .map(|r| r.target.has_children)
    };
    assert_eq!(by_id(&ids::boiler()), Some(Some(true)));
    assert_eq!(by_id(&ids::sensors()), Some(None));
}

#[tokio::test]
async fn test_look_ahead_can_be_disabled() {
    let mock = Arc::new(MockTransport::standard());
    let config = FacadeConfig {
        look_ahead: false,
        ..Default::default()
    };
    let services = NodeServices::new(Arc::clone(&mock), config);

    let response = services.browse_first(&ctx(), BrowseRequest::default()).await.unwrap();

    assert!(response.references.iter().all(|r| r.target.has_children.is_none()));
    // One browse for the page, none for children
    assert_eq!(mock.browse_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_target_nodes_only_deduplicates() {
    let (mock, services) = services();
    mock.add_reference(&well_known::OBJECTS_FOLDER, well_known::HAS_COMPONENT, &ids::boiler());

    let all = services
        .browse_first(&ctx(), browse_of(&well_known::OBJECTS_FOLDER))
        .await
        .unwrap();
    let boiler = address(&ids::boiler());
    assert_eq!(all.references.iter().filter(|r| r.target.node_id == boiler).count(), 2);

    let targets = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                target_nodes_only: true,
                ..browse_of(&well_known::OBJECTS_FOLDER)
            },
        )
        .await
        .unwrap();
    assert_eq!(targets.references.iter().filter(|r| r.target.node_id == boiler).count(), 1);
    assert!(targets.references.iter().all(|r| r.reference_type_id.is_none() && r.direction.is_none()));
}

#[tokio::test]
async fn test_node_ids_only_skips_attribute_reads() {
    let (mock, services) = services();

    let response = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                node_ids_only: true,
                ..browse_of(&ids::boiler())
            },
        )
        .await
        .unwrap();

    assert_eq!(mock.read_calls.load(Ordering::SeqCst), 0);
    assert_eq!(response.node.node_id, address(&ids::boiler()));
    assert!(response.node.has_children.is_none());
    assert!(response.references.iter().all(|r| r.target.detail.is_none()));
}

#[tokio::test]
async fn test_browse_reads_variable_values() {
    let (_mock, services) = services();

    let response = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                read_variable_values: true,
                ..browse_of(&ids::sensors())
            },
        )
        .await
        .unwrap();

    let values: Vec<Option<DynamicValue>> = response.references.iter().map(|r| r.target.value.clone()).collect();
    let expected: Vec<Option<DynamicValue>> = (0..SENSOR_COUNT).map(|i| Some(DynamicValue::Double(i as f64))).collect();
    assert_eq!(values, expected);
    assert_eq!(response.references[0].target.data_type_name.as_deref(), Some("Double"));
}

#[tokio::test]
async fn test_browse_unknown_node() {
    let (_mock, services) = services();

    let response = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                node_id: Some("nsu=urn:twin:test;s=Nowhere".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(status_of(&response.error_info), status_codes::BAD_NODE_ID_UNKNOWN);

    let response = services
        .browse_first(
            &ctx(),
            BrowseRequest {
                node_id: Some("ns=1;x=broken".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(status_of(&response.error_info), status_codes::BAD_NODE_ID_INVALID);
}

// =============================================================================
// Browse paths
// =============================================================================

#[tokio::test]
async fn test_browse_path_collects_targets() {
    let (_mock, services) = services();

    let response = services
        .browse_path(
            &ctx(),
            BrowsePathRequest {
                browse_paths: vec![
                    path(&["Objects", "Boiler", "Temperature"]),
                    path(&["Objects", "Missing"]),
                    path(&["/Objects", "/Sensors", "S3"]),
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(response.error_info.is_none());
    let reached: Vec<(Vec<String>, String)> = response
        .targets
        .iter()
        .map(|t| (t.browse_path.clone(), t.target.node_id.clone()))
        .collect();
    assert_eq!(
        reached,
        vec![
            (path(&["Objects", "Boiler", "Temperature"]), address(&ids::temperature())),
            (path(&["/Objects", "/Sensors", "S3"]), address(&ids::sensor(3))),
        ]
    );
}

#[tokio::test]
async fn test_browse_path_without_any_match() {
    let (_mock, services) = services();

    let response = services
        .browse_path(
            &ctx(),
            BrowsePathRequest {
                header: Some(RequestHeader::with_level(DiagnosticsLevel::Status)),
                browse_paths: vec![path(&["Objects", "Missing"])],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let error_info = response.error_info.unwrap();
    assert_eq!(error_info.status_code, status_codes::BAD_NO_MATCH);
    assert_eq!(error_info.diagnostics, Some(Diagnostics::Status(vec!["BadNoMatch".to_string()])));
}

#[tokio::test]
async fn test_browse_path_keeps_unreadable_targets() {
    let (mock, services) = services();
    mock.fail_read_of(&ids::temperature());

    let response = services
        .browse_path(
            &ctx(),
            BrowsePathRequest {
                header: Some(RequestHeader::with_level(DiagnosticsLevel::Status)),
                browse_paths: vec![
                    path(&["Objects", "Boiler", "Temperature"]),
                    path(&["/Objects", "/Sensors", "S3"]),
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(response.targets.len(), 2);
    let unreadable = &response.targets[0].target;
    assert_eq!(unreadable.node_id, address(&ids::temperature()));
    assert!(unreadable.node_class.is_none());
    let sensor = &response.targets[1].target;
    assert_eq!(sensor.node_id, address(&ids::sensor(3)));
    assert!(sensor.node_class.is_some());

    let error_info = response.error_info.unwrap();
    assert!(error_info.is_good());
    match error_info.diagnostics {
        Some(Diagnostics::Status(names)) => assert!(names.contains(&"BadNodeIdUnknown".to_string())),
        other => panic!("unexpected diagnostics: {:?}", other),
    }
}

// =============================================================================
// Values
// =============================================================================

#[tokio::test]
async fn test_read_value_by_path() {
    let (_mock, services) = services();

    let response = services
        .read_value(
            &ctx(),
            ValueReadRequest {
                browse_path: path(&["Objects", "Boiler", "Temperature"]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(response.error_info.is_none());
    assert_eq!(response.value, Some(DynamicValue::Double(21.5)));
    assert_eq!(response.data_type.as_deref(), Some("Double"));
    assert!(response.source_timestamp.is_some());
    assert!(response.server_timestamp.is_some());
}

#[tokio::test]
async fn test_read_value_relative_path() {
    let (_mock, services) = services();

    let response = services
        .read_value(
            &ctx(),
            ValueReadRequest {
                node_id: Some(address(&ids::boiler())),
                browse_path: path(&[".Temperature"]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response.value, Some(DynamicValue::Double(21.5)));
}

#[tokio::test]
async fn test_read_value_ambiguous_path() {
    let (mock, services) = services();
    mock.add_child(
        &ids::boiler(),
        well_known::ORGANIZES,
        twin_opcua::NodeId::string(1, "Boiler.Temperature2"),
        common::MockNode::new(NodeClass::Variable, 1, "Temperature"),
    );

    let response = services
        .read_value(
            &ctx(),
            ValueReadRequest {
                browse_path: path(&["Objects", "Boiler", "Temperature"]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(status_of(&response.error_info), status_codes::BAD_BROWSE_NAME_DUPLICATED);
}

#[tokio::test]
async fn test_read_value_requires_address() {
    let (_mock, services) = services();

    let response = services.read_value(&ctx(), ValueReadRequest::default()).await.unwrap();
    assert_eq!(status_of(&response.error_info), status_codes::BAD_NODE_ID_INVALID);
}

#[tokio::test]
async fn test_boolean_array_round_trip() {
    let (mock, services) = services();
    let flags: Vec<DynamicValue> = (0..26).map(|i| DynamicValue::Boolean(i % 3 == 0)).collect();

    let written = services
        .write_value(
            &ctx(),
            ValueWriteRequest {
                node_id: Some(address(&ids::flags())),
                value: DynamicValue::List(flags.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(written.error_info.is_none());
    match mock.attribute(&ids::flags(), AttributeId::Value) {
        Some(Variant::Array { items, .. }) => assert_eq!(items.len(), 26),
        other => panic!("unexpected stored value: {:?}", other),
    }

    let read = services
        .read_value(
            &ctx(),
            ValueReadRequest {
                node_id: Some(address(&ids::flags())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(read.value, Some(DynamicValue::List(flags)));
    assert_eq!(read.data_type.as_deref(), Some("Boolean"));
}

#[tokio::test]
async fn test_abstract_declared_types_reported() {
    let (_mock, services) = services();

    let cases = [
        (ids::setpoint(), DynamicValue::Int64(5), DynamicValue::Double(5.0), "Number"),
        (ids::counter(), DynamicValue::Int32(-7), DynamicValue::Int32(-7), "Integer"),
        (ids::mode(), DynamicValue::from("Heating_5"), DynamicValue::Int32(5), "Enumeration"),
    ];

    for (node_id, input, expected, type_name) in cases {
        let written = services
            .write_value(
                &ctx(),
                ValueWriteRequest {
                    node_id: Some(address(&node_id)),
                    value: input,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(written.error_info.is_none(), "{}: {:?}", type_name, written.error_info);

        let read = services
            .read_value(
                &ctx(),
                ValueReadRequest {
                    node_id: Some(address(&node_id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(read.value, Some(expected));
        assert_eq!(read.data_type.as_deref(), Some(type_name));
    }
}

#[tokio::test]
async fn test_write_value_with_explicit_type() {
    let (mock, services) = services();

    let written = services
        .write_value(
            &ctx(),
            ValueWriteRequest {
                node_id: Some(address(&ids::setpoint())),
                value: DynamicValue::Double(2.5),
                data_type: Some("Float".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(written.error_info.is_none());
    assert_eq!(
        mock.attribute(&ids::setpoint(), AttributeId::Value),
        Some(Variant::Scalar(Scalar::Float(2.5)))
    );
}

#[tokio::test]
async fn test_write_value_failures() {
    let (mock, services) = services();

    let mismatch = services
        .write_value(
            &ctx(),
            ValueWriteRequest {
                node_id: Some(address(&ids::temperature())),
                value: DynamicValue::List(vec![DynamicValue::Double(1.0)]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(status_of(&mismatch.error_info), status_codes::BAD_TYPE_MISMATCH);

    let out_of_range = services
        .write_value(
            &ctx(),
            ValueWriteRequest {
                node_id: Some(address(&ids::setpoint())),
                value: DynamicValue::Int64(i64::MAX),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(status_of(&out_of_range.error_info), status_codes::BAD_OUT_OF_RANGE);

    let locked = services
        .write_value(
            &ctx(),
            ValueWriteRequest {
                node_id: Some(address(&ids::locked())),
                value: DynamicValue::from("open"),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(status_of(&locked.error_info), status_codes::BAD_NOT_WRITABLE);

    // Only the locked write reached the server
    assert_eq!(mock.writes().len(), 1);
}

// =============================================================================
// Attributes
// =============================================================================

#[tokio::test]
async fn test_read_attributes_items_fail_independently() {
    let (_mock, services) = services();

    let response = services
        .read_attributes(
            &ctx(),
            ReadRequest {
                header: None,
                attributes: vec![
                    AttributeReadItem {
                        node_id: address(&ids::temperature()),
                        attribute: AttributeId::DisplayName,
                    },
                    AttributeReadItem {
                        node_id: "ns=1;q=bad".into(),
                        attribute: AttributeId::Value,
                    },
                    AttributeReadItem {
                        node_id: address(&ids::boiler()),
                        attribute: AttributeId::Description,
                    },
                    AttributeReadItem {
                        node_id: address(&ids::boiler()),
                        attribute: AttributeId::ValueRank,
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert!(response.error_info.is_none());
    assert_eq!(response.results.len(), 4);
    assert_eq!(response.results[0].value, Some(DynamicValue::from("Temperature")));
    assert_eq!(status_of(&response.results[1].error_info), status_codes::BAD_NODE_ID_INVALID);
    assert_eq!(response.results[2].value, Some(DynamicValue::from("Main boiler")));
    assert_eq!(status_of(&response.results[3].error_info), status_codes::BAD_ATTRIBUTE_ID_INVALID);
}

#[tokio::test]
async fn test_write_attributes() {
    let (mock, services) = services();

    let response = services
        .write_attributes(
            &ctx(),
            WriteRequest {
                header: None,
                attributes: vec![
                    AttributeWriteItem {
                        node_id: address(&ids::temperature()),
                        attribute: AttributeId::DisplayName,
                        value: DynamicValue::from("Water temperature"),
                    },
                    AttributeWriteItem {
                        node_id: address(&ids::temperature()),
                        attribute: AttributeId::Value,
                        value: DynamicValue::Double(80.0),
                    },
                    AttributeWriteItem {
                        node_id: address(&ids::temperature()),
                        attribute: AttributeId::BrowseName,
                        value: DynamicValue::from("Renamed"),
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert!(response.results[0].error_info.is_none());
    assert!(response.results[1].error_info.is_none());
    assert_eq!(status_of(&response.results[2].error_info), status_codes::BAD_NOT_WRITABLE);
    assert_eq!(
        mock.attribute(&ids::temperature(), AttributeId::Value),
        Some(Variant::Scalar(Scalar::Double(80.0)))
    );

    let read = services
        .read_attributes(
            &ctx(),
            ReadRequest {
                header: None,
                attributes: vec![AttributeReadItem {
                    node_id: address(&ids::temperature()),
                    attribute: AttributeId::DisplayName,
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(read.results[0].value, Some(DynamicValue::from("Water temperature")));
}

#[tokio::test]
async fn test_read_attributes_short_answer_fails_missing_items() {
    let (mock, services) = services();
    mock.limit_results(1);

    let response = services
        .read_attributes(
            &ctx(),
            ReadRequest {
                header: Some(RequestHeader::with_level(DiagnosticsLevel::Status)),
                attributes: vec![
                    AttributeReadItem {
                        node_id: address(&ids::temperature()),
                        attribute: AttributeId::DisplayName,
                    },
                    AttributeReadItem {
                        node_id: address(&ids::boiler()),
                        attribute: AttributeId::Description,
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].value, Some(DynamicValue::from("Temperature")));
    assert!(response.results[1].value.is_none());
    let missing = response.results[1].error_info.as_ref().unwrap();
    assert_eq!(missing.status_code, status_codes::BAD_UNEXPECTED_ERROR);
    assert!(missing.error_message.is_some());

    match response.error_info.unwrap().diagnostics {
        Some(Diagnostics::Status(names)) => assert!(names.contains(&"BadUnexpectedError".to_string())),
        other => panic!("unexpected diagnostics: {:?}", other),
    }
}

#[tokio::test]
async fn test_write_attributes_short_answer_fails_missing_items() {
    let (mock, services) = services();
    mock.limit_results(1);

    let response = services
        .write_attributes(
            &ctx(),
            WriteRequest {
                header: Some(RequestHeader::with_level(DiagnosticsLevel::Status)),
                attributes: vec![
                    AttributeWriteItem {
                        node_id: address(&ids::temperature()),
                        attribute: AttributeId::DisplayName,
                        value: DynamicValue::from("Water temperature"),
                    },
                    AttributeWriteItem {
                        node_id: address(&ids::boiler()),
                        attribute: AttributeId::Description,
                        value: DynamicValue::from("Spare boiler"),
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(response.results.len(), 2);
    assert!(response.results[0].error_info.is_none());
    assert_eq!(status_of(&response.results[1].error_info), status_codes::BAD_UNEXPECTED_ERROR);

    match response.error_info.unwrap().diagnostics {
        Some(Diagnostics::Status(names)) => assert!(names.contains(&"BadUnexpectedError".to_string())),
        other => panic!("unexpected diagnostics: {:?}", other),
    }
}

// =============================================================================
// Methods
// =============================================================================

#[tokio::test]
async fn test_call_method_defaults_missing_arguments() {
    let (mock, services) = services();

    let response = services
        .call_method(
            &ctx(),
            MethodCallRequest {
                method_id: Some(address(&ids::reset())),
                arguments: vec![MethodCallArgument {
                    value: Some(DynamicValue::Double(2.5)),
                    data_type: None,
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(response.error_info.is_none(), "{:?}", response.error_info);
    assert_eq!(
        response.results,
        vec![MethodCallArgument {
            value: Some(DynamicValue::Double(0.5)),
            data_type: Some("Double".into()),
        }]
    );

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].object_id, ids::boiler());
    assert_eq!(
        calls[0].input_arguments,
        vec![
            Variant::Scalar(Scalar::Double(2.5)),
            Variant::Scalar(Scalar::UInt32(3)),
            Variant::Scalar(Scalar::String(String::new())),
        ]
    );
}

#[tokio::test]
async fn test_call_method_by_paths() {
    let (mock, services) = services();

    let response = services
        .call_method(
            &ctx(),
            MethodCallRequest {
                object_browse_path: path(&["Objects", "Boiler"]),
                method_browse_path: path(&["Reset"]),
                arguments: vec![
                    MethodCallArgument {
                        value: Some(DynamicValue::from("1.5")),
                        data_type: None,
                    },
                    MethodCallArgument::default(),
                    MethodCallArgument {
                        value: Some(DynamicValue::from("purge")),
                        data_type: None,
                    },
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(response.error_info.is_none(), "{:?}", response.error_info);
    let calls = mock.calls();
    assert_eq!(calls[0].method_id, ids::reset());
    assert_eq!(
        calls[0].input_arguments,
        vec![
            Variant::Scalar(Scalar::Double(1.5)),
            Variant::Scalar(Scalar::UInt32(3)),
            Variant::Scalar(Scalar::String("purge".into())),
        ]
    );
}

#[tokio::test]
async fn test_call_method_ids_take_precedence() {
    let (mock, services) = services();

    let combinations = [
        (Some(address(&ids::reset())), path(&["Elsewhere"]), None, Vec::new()),
        (None, path(&["Reset"]), Some(address(&ids::boiler())), path(&["Objects", "Sensors"])),
        (Some(address(&ids::reset())), Vec::new(), Some(address(&ids::boiler())), path(&["Nope"])),
    ];

    for (method_id, method_browse_path, object_id, object_browse_path) in combinations {
        let response = services
            .call_method(
                &ctx(),
                MethodCallRequest {
                    method_id,
                    method_browse_path,
                    object_id,
                    object_browse_path,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(response.error_info.is_none(), "{:?}", response.error_info);
    }

    for call in mock.calls() {
        assert_eq!(call.method_id, ids::reset());
        assert_eq!(call.object_id, ids::boiler());
    }
    assert_eq!(mock.calls().len(), 3);
}

#[tokio::test]
async fn test_call_method_argument_errors() {
    let (mock, services) = services();
    let call = |arguments: Vec<MethodCallArgument>| MethodCallRequest {
        method_id: Some(address(&ids::reset())),
        arguments,
        ..Default::default()
    };

    let too_many = services
        .call_method(&ctx(), call(vec![MethodCallArgument::default(); 4]))
        .await
        .unwrap();
    assert_eq!(status_of(&too_many.error_info), status_codes::BAD_TOO_MANY_ARGUMENTS);

    let negative_count = services
        .call_method(
            &ctx(),
            call(vec![
                MethodCallArgument::default(),
                MethodCallArgument {
                    value: Some(DynamicValue::Int64(-1)),
                    data_type: None,
                },
            ]),
        )
        .await
        .unwrap();
    assert_eq!(status_of(&negative_count.error_info), status_codes::BAD_OUT_OF_RANGE);

    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_call_method_server_rejection() {
    let (mock, services) = services();
    let orphan = twin_opcua::NodeId::string(1, "Boiler.Orphan");
    mock.add_child(
        &ids::boiler(),
        well_known::HAS_COMPONENT,
        orphan.clone(),
        common::MockNode::new(NodeClass::Method, 1, "Orphan"),
    );

    let response = services
        .call_method(
            &ctx(),
            MethodCallRequest {
                method_id: Some(address(&orphan)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(status_of(&response.error_info), status_codes::BAD_METHOD_INVALID);
    assert_eq!(mock.calls().len(), 1);
}

#[tokio::test]
async fn test_method_metadata() {
    let (_mock, services) = services();

    let response = services
        .method_metadata(
            &ctx(),
            MethodMetadataRequest {
                method_browse_path: path(&["Objects", "Boiler", "Reset"]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(response.error_info.is_none(), "{:?}", response.error_info);
    assert_eq!(response.object_id, Some(address(&ids::boiler())));

    let names: Vec<&str> = response.input_arguments.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Gain", "Count", "Label"]);

    let gain = &response.input_arguments[0];
    assert_eq!(gain.data_type, "Double");
    assert_eq!(gain.data_type_name.as_deref(), Some("Double"));
    assert_eq!(gain.description.as_deref(), Some("Loop gain"));
    assert!(gain.value_rank.is_none());

    assert_eq!(response.input_arguments[1].default_value, Some(DynamicValue::UInt32(3)));
    assert_eq!(response.output_arguments.len(), 1);
    assert_eq!(response.output_arguments[0].name, "Result");
}

// =============================================================================
// Diagnostics and failures
// =============================================================================

#[tokio::test]
async fn test_success_carries_requested_diagnostics() {
    let (_mock, services) = services();

    let response = services
        .read_attributes(
            &ctx(),
            ReadRequest {
                header: Some(RequestHeader::with_level(DiagnosticsLevel::Operations)),
                attributes: vec![AttributeReadItem {
                    node_id: address(&ids::boiler()),
                    attribute: AttributeId::ValueRank,
                }],
            },
        )
        .await
        .unwrap();

    let error_info = response.error_info.unwrap();
    assert!(error_info.is_good());
    match error_info.diagnostics {
        Some(Diagnostics::Operations(grouped)) => {
            assert!(grouped.contains_key("BadAttributeIdInvalid"));
        }
        other => panic!("unexpected diagnostics: {:?}", other),
    }
}

#[tokio::test]
async fn test_no_diagnostics_by_default() {
    let (_mock, services) = services();

    let response = services
        .read_value(
            &ctx(),
            ValueReadRequest {
                node_id: Some("nsu=urn:twin:test;s=Nowhere".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let error_info = response.error_info.unwrap();
    assert_eq!(error_info.status_code, status_codes::BAD_NODE_ID_UNKNOWN);
    assert!(error_info.error_message.is_some());
    assert!(error_info.diagnostics.is_none());
}

#[tokio::test]
async fn test_systemic_failure_is_returned_as_error() {
    let (mock, services) = services();
    mock.go_offline();

    let error = services.browse_first(&ctx(), BrowseRequest::default()).await.unwrap_err();
    assert!(error.is_systemic());
}

#[tokio::test]
async fn test_cancelled_call() {
    let (mock, services) = services();
    let token = CancelToken::new();
    token.cancel();
    let ctx = SessionContext::new(common::SESSION).with_cancel_token(token);

    let response = services.browse_first(&ctx, BrowseRequest::default()).await.unwrap();

    assert_eq!(status_of(&response.error_info), status_codes::BAD_REQUEST_CANCELLED_BY_CLIENT);
    assert_eq!(mock.browse_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_context_timeout_overrides_config() {
    let (_mock, services) = services();
    let ctx = ctx().with_timeout(Duration::from_secs(5));

    let response = services
        .read_value(
            &ctx,
            ValueReadRequest {
                node_id: Some(address(&ids::temperature())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(response.error_info.is_none());
}
