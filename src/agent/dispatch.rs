//! Request dispatch: Get and GetNext against the MIB tree.

use crate::error::{Error, ErrorStatus, Result};
use crate::message::CommunityMessage;
use crate::mib::Lookup;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

use super::Agent;

impl Agent {
    /// Answer one decoded request.
    ///
    /// Returns `Ok(None)` when the community is not accepted; such requests
    /// get no reply. Request kinds other than Get and GetNext fail with
    /// [`Error::UnknownMessageKind`].
    pub async fn handle_message(
        &mut self,
        message: CommunityMessage,
    ) -> Result<Option<CommunityMessage>> {
        if !self.communities.allows(&message.community) {
            tracing::debug!(
                target: "snmp_mib_agent::agent",
                community = %String::from_utf8_lossy(&message.community),
                "community not accepted, dropping request"
            );
            return Ok(None);
        }

        let response = match message.pdu.pdu_type {
            PduType::GetRequest => self.handle_get(message.version, &message.pdu).await,
            PduType::GetNextRequest => {
                self.handle_get_next(message.version, &message.pdu).await
            }
            pdu_type => return Err(Error::UnknownMessageKind { pdu_type }),
        };
        Ok(Some(message.reply(response)))
    }

    /// Each varbind gets its value, or `noSuchObject` when the tree holds
    /// nothing but a subtree or no entry at that OID.
    ///
    /// SNMPv1 has no exception values and no Counter64, so a v1 request
    /// naming such an object is answered with a noSuchName error instead.
    async fn handle_get(&mut self, version: Version, request: &Pdu) -> Pdu {
        let mut response = request.to_response();

        for (index, vb) in request.varbinds.iter().enumerate() {
            let value = match self.tree.lookup(vb.oid.arcs()).await {
                Lookup::Value(value) => value,
                Lookup::Subtree(_) | Lookup::NoEntry => {
                    tracing::trace!(target: "snmp_mib_agent::agent", { snmp.oid = %vb.oid }, "no such object");
                    Value::NoSuchObject
                }
            };
            if version == Version::V1 && value.is_v2_only() {
                response.set_error(ErrorStatus::NoSuchName, index + 1);
            }
            response.varbinds.push(VarBind::new(vb.oid.clone(), value));
        }

        if response.is_error() {
            response.varbinds = request.varbinds.clone();
        }
        response
    }

    /// Each varbind is replaced by the next OID in the tree and its value.
    ///
    /// A varbind past the end of the tree comes back as `0.0` with the
    /// request value, and the response carries noSuchName pointing at the
    /// first such varbind (1-based). For SNMPv1, objects a v1 message cannot
    /// carry are stepped over.
    async fn handle_get_next(&mut self, version: Version, request: &Pdu) -> Pdu {
        let mut response = request.to_response();

        for (index, vb) in request.varbinds.iter().enumerate() {
            match self.next_value(version, vb.oid.arcs()).await {
                Some(found) => response.varbinds.push(found),
                None => {
                    tracing::trace!(target: "snmp_mib_agent::agent", { snmp.oid = %vb.oid }, "end of tree");
                    response.set_error(ErrorStatus::NoSuchName, index + 1);
                    response
                        .varbinds
                        .push(VarBind::new(end_of_tree(), vb.value.clone()));
                }
            }
        }
        response
    }

    async fn next_value(&mut self, version: Version, start: &[u32]) -> Option<VarBind> {
        let mut cursor = start.to_vec();
        loop {
            let next = self.tree.next_oid(&cursor).await?;
            let value = self
                .tree
                .lookup(&next)
                .await
                .into_value()
                .unwrap_or(Value::NoSuchObject);
            if version == Version::V1 && value.is_v2_only() {
                tracing::trace!(target: "snmp_mib_agent::agent", { snmp.oid = %Oid::from_slice(&next) }, "skipping value v1 cannot carry");
                cursor = next;
                continue;
            }
            return Some(VarBind::new(Oid::from(next), value));
        }
    }
}

/// Name given to a GetNext varbind that ran off the end of the tree.
///
/// A lone `0` has no BER form; `0.0` is how it goes on the wire.
fn end_of_tree() -> Oid {
    Oid::from_slice(&[0, 0])
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bytes::Bytes;

    use super::*;
    use crate::mib::PluginData;
    use crate::oid;

    async fn agent() -> Agent {
        let mut agent = Agent::builder()
            .bind("127.0.0.1:0")
            .community("public")
            .system_group(false)
            .build()
            .await
            .unwrap();
        agent
            .add_plugin(oid!(1, 2, 3), || Ok(vec![1, 1, 2, 3, 5, 8, 13]))
            .unwrap();
        let mut table = BTreeMap::new();
        table.insert(2, PluginData::from("two"));
        table.insert(5, PluginData::from(vec![50, 51]));
        agent.add_value(oid!(1, 2, 9), table).unwrap();
        agent
    }

    fn request(version: Version, community: &'static [u8], pdu: Pdu) -> CommunityMessage {
        CommunityMessage::new(version, Bytes::from_static(community), pdu)
    }

    async fn ask(agent: &mut Agent, pdu: Pdu) -> Pdu {
        agent
            .handle_message(request(Version::V2c, b"public", pdu))
            .await
            .unwrap()
            .unwrap()
            .pdu
    }

    #[tokio::test]
    async fn test_get_values_and_no_such_object() {
        let mut agent = agent().await;
        let oids = [oid!(1, 2, 3, 4), oid!(1, 2, 9, 2), oid!(1, 2, 3), oid!(1, 7)];
        let response = ask(&mut agent, Pdu::get_request(42, &oids)).await;

        assert_eq!(response.pdu_type, PduType::Response);
        assert_eq!(response.request_id, 42);
        assert!(!response.is_error());
        let values: Vec<_> = response.varbinds.iter().map(|vb| vb.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Value::Integer(5),
                Value::from("two"),
                Value::NoSuchObject,
                Value::NoSuchObject,
            ]
        );
        assert_eq!(response.varbinds[3].oid, oid!(1, 7));
    }

    #[tokio::test]
    async fn test_get_v1_reports_no_such_name() {
        let mut agent = agent().await;
        let oids = [oid!(1, 2, 3, 0), oid!(1, 2, 8), oid!(1, 9)];
        let reply = agent
            .handle_message(request(Version::V1, b"public", Pdu::get_request(1, &oids)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.version, Version::V1);
        assert_eq!(reply.pdu.error_status(), ErrorStatus::NoSuchName);
        assert_eq!(reply.pdu.error_index, 2);
        assert_eq!(reply.pdu.varbinds, Pdu::get_request(1, &oids).varbinds);
    }

    #[tokio::test]
    async fn test_get_next_walks_across_plugins() {
        let mut agent = agent().await;
        let oids = [oid!(1, 2, 3, 6), oid!(1, 2, 9, 2), oid!(1), oid!(1, 2, 3, 2, 7)];
        let response = ask(&mut agent, Pdu::get_next_request(3, &oids)).await;

        assert!(!response.is_error());
        let got: Vec<_> = response
            .varbinds
            .iter()
            .map(|vb| (vb.oid.to_string(), vb.value.clone()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("1.2.9.2".to_string(), Value::from("two")),
                ("1.2.9.5.0".to_string(), Value::Integer(50)),
                ("1.2.3.0".to_string(), Value::Integer(1)),
                ("1.2.3.3".to_string(), Value::Integer(3)),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_next_past_end() {
        let mut agent = agent().await;
        let oids = [oid!(1, 2, 3, 0), oid!(1, 2, 9, 5, 1), oid!(2)];
        let response = ask(&mut agent, Pdu::get_next_request(4, &oids)).await;

        assert_eq!(response.error_status(), ErrorStatus::NoSuchName);
        assert_eq!(response.error_index, 2);
        assert_eq!(response.varbinds[0].oid, oid!(1, 2, 3, 1));
        assert_eq!(response.varbinds[1].oid, oid!(0, 0));
        assert_eq!(response.varbinds[1].value, Value::Null);
        assert_eq!(response.varbinds[2].oid, oid!(0, 0));
    }

    #[tokio::test]
    async fn test_v1_steps_over_counter64() {
        let mut agent = agent().await;
        agent.add_value(oid!(1, 2, 5), Value::Counter64(1 << 40)).unwrap();

        let oids = [oid!(1, 2, 3, 6)];
        let v2c = ask(&mut agent, Pdu::get_next_request(7, &oids)).await;
        assert_eq!(
            v2c.varbinds,
            vec![VarBind::new(oid!(1, 2, 5), Value::Counter64(1 << 40))]
        );

        let v1 = agent
            .handle_message(request(Version::V1, b"public", Pdu::get_next_request(8, &oids)))
            .await
            .unwrap()
            .unwrap()
            .pdu;
        assert!(!v1.is_error());
        assert_eq!(v1.varbinds, vec![VarBind::new(oid!(1, 2, 9, 2), Value::from("two"))]);

        let get = agent
            .handle_message(request(Version::V1, b"public", Pdu::get_request(9, &[oid!(1, 2, 5)])))
            .await
            .unwrap()
            .unwrap()
            .pdu;
        assert_eq!(get.error_status(), ErrorStatus::NoSuchName);
        assert_eq!(get.error_index, 1);
    }

    #[tokio::test]
    async fn test_v1_get_next_past_counter64_at_end() {
        let mut agent = agent().await;
        agent.add_value(oid!(1, 3), Value::Counter64(5)).unwrap();

        let v1 = agent
            .handle_message(request(
                Version::V1,
                b"public",
                Pdu::get_next_request(10, &[oid!(1, 2, 9, 5, 1)]),
            ))
            .await
            .unwrap()
            .unwrap()
            .pdu;
        assert_eq!(v1.error_status(), ErrorStatus::NoSuchName);
        assert_eq!(v1.varbinds[0].oid, oid!(0, 0));
    }

    #[tokio::test]
    async fn test_unknown_community_dropped() {
        let mut agent = agent().await;
        let oids = [oid!(1, 2, 3, 0)];
        let reply = agent
            .handle_message(request(Version::V2c, b"private", Pdu::get_request(5, &oids)))
            .await
            .unwrap();
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_other_pdu_kinds_rejected() {
        let mut agent = agent().await;
        let mut pdu = Pdu::get_request(6, &[oid!(1, 2, 3, 0)]);
        pdu.pdu_type = PduType::SetRequest;
        let err = agent
            .handle_message(request(Version::V2c, b"public", pdu))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownMessageKind {
                pdu_type: PduType::SetRequest
            }
        ));
    }
}
