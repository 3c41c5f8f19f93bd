use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::utils::{ensure, get_str, get_u32, put_str};
use crate::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescriptor {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: u16,
    pub config_entries: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct CreateTopicsRequest {
    pub topics: Vec<TopicDescriptor>,
}

/*
frame: [u32 count]
       ([u32 name_len][name][u32 partitions][u16 replication]
        [u32 entry_count]([u32 k_len][k][u32 v_len][v])*)*
*/
impl CreateTopicsRequest {
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u32(self.topics.len() as u32);
        for topic in &self.topics {
            put_str(&mut buf, &topic.name);
            buf.put_u32(topic.partitions);
            buf.put_u16(topic.replication_factor);
            buf.put_u32(topic.config_entries.len() as u32);
            for (name, value) in &topic.config_entries {
                put_str(&mut buf, name);
                put_str(&mut buf, value);
            }
        }
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let count = get_u32(&mut buf, "topic count")?;
        let mut topics = Vec::with_capacity(count.min(1024) as usize);

        for _ in 0..count {
            let name = get_str(&mut buf, "topic name")?;
            let partitions = get_u32(&mut buf, "partition count")?;
            ensure(&buf, 2, "replication factor")?;
            let replication_factor = buf.get_u16();

            let entry_count = get_u32(&mut buf, "config entry count")?;
            let mut config_entries = Vec::with_capacity(entry_count.min(1024) as usize);
            for _ in 0..entry_count {
                let key = get_str(&mut buf, "config entry name")?;
                let value = get_str(&mut buf, "config entry value")?;
                config_entries.push((key, value));
            }

            topics.push(TopicDescriptor {
                name,
                partitions,
                replication_factor,
                config_entries,
            });
        }

        Ok(Self { topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_entries_keep_their_order() {
        let req = CreateTopicsRequest {
            topics: vec![TopicDescriptor {
                name: "orders".into(),
                partitions: 3,
                replication_factor: 1,
                config_entries: vec![
                    ("compression.type".into(), "gzip".into()),
                    ("cleanup.policy".into(), "compact".into()),
                ],
            }],
        };

        let parsed = CreateTopicsRequest::deserialize(req.serialize()).unwrap();
        assert_eq!(parsed.topics, req.topics);
    }

    #[test]
    fn test_truncated_request_is_a_payload_error() {
        let req = CreateTopicsRequest {
            topics: vec![TopicDescriptor {
                name: "orders".into(),
                partitions: 1,
                replication_factor: 1,
                config_entries: vec![],
            }],
        };
        let bytes = req.serialize();

        let err = CreateTopicsRequest::deserialize(bytes.slice(..bytes.len() - 2)).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadError(_)));
    }
}
