//! Per-node report printed at the end of a run.

use std::fmt;

use serde::Serialize;
use zwave_frame::hex_byte;
use zwave_node::{
    BasicCommandClass, BinarySwitchCommandClass, ManufacturerSpecificCommandClass,
    MultilevelSwitchCommandClass, NodeState, VersionCommandClass, ZWaveNode,
};

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSummary {
    pub cycles: u64,
    pub started: usize,
    pub nodes: Vec<NodeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub node_id: u8,
    pub profile: &'static str,
    pub state: NodeState,
    pub listening: bool,
    pub command_classes: Vec<CommandClassSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<FirmwareSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<ManufacturerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub write_queue: usize,
    pub wakeup_queue: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandClassSummary {
    pub id: String,
    pub name: &'static str,
    pub version: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct FirmwareSummary {
    pub library: String,
    pub protocol: String,
    pub application: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManufacturerSummary {
    pub manufacturer_id: String,
    pub product_type_id: String,
    pub product_id: String,
}

impl NetworkSummary {
    pub fn new<'a>(cycles: u64, nodes: impl Iterator<Item = &'a ZWaveNode>) -> Self {
        let nodes: Vec<NodeSummary> = nodes.map(NodeSummary::from_node).collect();
        let started = nodes
            .iter()
            .filter(|n| n.state == NodeState::Started)
            .count();
        NetworkSummary {
            cycles,
            started,
            nodes,
        }
    }
}

impl NodeSummary {
    pub fn from_node(node: &ZWaveNode) -> Self {
        let command_classes = node
            .command_classes()
            .map(|cc| CommandClassSummary {
                id: hex_byte(cc.id()),
                name: cc.name(),
                version: cc.version(),
            })
            .collect();

        let firmware = node.command_class_as::<VersionCommandClass>().and_then(|v| {
            Some(FirmwareSummary {
                library: v.library()?.to_string(),
                protocol: v.protocol()?.to_string(),
                application: v.application()?.to_string(),
            })
        });

        let manufacturer = node
            .command_class_as::<ManufacturerSpecificCommandClass>()
            .and_then(|m| m.identity())
            .map(|identity| ManufacturerSummary {
                manufacturer_id: format!("0x{:04X}", identity.manufacturer_id),
                product_type_id: format!("0x{:04X}", identity.product_type_id),
                product_id: format!("0x{:04X}", identity.product_id),
            });

        NodeSummary {
            node_id: node.node_id().as_u8(),
            profile: node.profile_name(),
            state: node.state(),
            listening: node.is_listening(),
            command_classes,
            firmware,
            manufacturer,
            level: level_of(node),
            write_queue: node.write_queue_len(),
            wakeup_queue: node.wakeup_queue_len(),
        }
    }
}

/// Most specific level the node has learned.
fn level_of(node: &ZWaveNode) -> Option<u8> {
    node.command_class_as::<MultilevelSwitchCommandClass>()
        .and_then(|cc| cc.level())
        .or_else(|| {
            node.command_class_as::<BinarySwitchCommandClass>()
                .and_then(|cc| cc.is_on())
                .map(|on| if on { 0xFF } else { 0x00 })
        })
        .or_else(|| {
            node.command_class_as::<BasicCommandClass>()
                .and_then(|cc| cc.value())
        })
}

impl fmt::Display for NetworkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} of {} nodes started after {} cycles",
            self.started,
            self.nodes.len(),
            self.cycles
        )?;
        for node in &self.nodes {
            writeln!(
                f,
                "node {:>3}  {:<26} {:<18} listening={}",
                node.node_id,
                node.state.to_string(),
                node.profile,
                node.listening
            )?;
            for cc in &node.command_classes {
                writeln!(f, "    {} {} v{}", cc.id, cc.name, cc.version)?;
            }
            if let Some(fw) = &node.firmware {
                writeln!(
                    f,
                    "    firmware: library={} protocol={} application={}",
                    fw.library, fw.protocol, fw.application
                )?;
            }
            if let Some(m) = &node.manufacturer {
                writeln!(
                    f,
                    "    manufacturer: {} product type: {} product: {}",
                    m.manufacturer_id, m.product_type_id, m.product_id
                )?;
            }
            if let Some(level) = node.level {
                writeln!(f, "    level: {}", level)?;
            }
            if node.write_queue > 0 || node.wakeup_queue > 0 {
                writeln!(
                    f,
                    "    queued: {} to send, {} waiting for wake-up",
                    node.write_queue, node.wakeup_queue
                )?;
            }
        }
        Ok(())
    }
}
