//! Qdisc requests and qdisc dump parsing.
//!
//! Qdisc kinds plug in through [`QdiscConfig`], which names the kind and
//! writes its TCA_OPTIONS payload.

use super::attr::AttrIter;
use super::builder::MessageBuilder;
use super::error::Result;
use super::message::{NLM_F_CREATE, NLM_F_DUMP, NLM_F_REPLACE, NLM_F_REQUEST, NlMsgType};
use super::parse::{FromNetlink, PResult, cut, parse_attr, parse_header, parse_string_from_bytes};
use super::types::tc::{TcMsg, netem::TcNetemQopt, tbf, tca};
use zerocopy::FromBytes;

/// Configuration of one qdisc kind.
pub trait QdiscConfig {
    /// The qdisc kind (e.g. "netem", "tbf").
    fn kind(&self) -> &'static str;

    /// Write the TCA_OPTIONS payload.
    fn write_options(&self, builder: &mut MessageBuilder) -> Result<()>;

    /// Whether TCA_OPTIONS is a pure attribute nest.
    ///
    /// Kinds whose options start with a fixed struct return `false`.
    fn nested_options(&self) -> bool {
        true
    }
}

/// Where a qdisc sits in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QdiscPlacement {
    /// Interface index.
    pub ifindex: u32,
    /// Parent handle (`TC_H_ROOT` for the root qdisc).
    pub parent: u32,
    /// Qdisc handle.
    pub handle: u32,
}

impl QdiscPlacement {
    fn tcmsg(&self) -> TcMsg {
        TcMsg::new()
            .with_ifindex(self.ifindex as i32)
            .with_parent(self.parent)
            .with_handle(self.handle)
    }
}

/// Build an RTM_NEWQDISC request that creates or replaces the qdisc at `placement`.
pub fn replace_qdisc(placement: QdiscPlacement, config: &impl QdiscConfig) -> Result<MessageBuilder> {
    let mut builder = MessageBuilder::new(
        NlMsgType::RTM_NEWQDISC,
        NLM_F_REQUEST | NLM_F_CREATE | NLM_F_REPLACE,
    );
    builder.append(&placement.tcmsg());
    builder.append_attr_str(tca::KIND, config.kind());

    let options = if config.nested_options() {
        builder.nest_start(tca::OPTIONS)
    } else {
        builder.attr_start(tca::OPTIONS)
    };
    config.write_options(&mut builder)?;
    builder.nest_end(options);

    Ok(builder)
}

/// Build an RTM_DELQDISC request for the qdisc at `placement`.
pub fn delete_qdisc(placement: QdiscPlacement) -> MessageBuilder {
    let mut builder = MessageBuilder::new(NlMsgType::RTM_DELQDISC, NLM_F_REQUEST);
    builder.append(&placement.tcmsg());
    builder
}

/// Build an RTM_GETQDISC dump request.
pub fn dump_qdiscs(ifindex: u32) -> MessageBuilder {
    let mut builder = MessageBuilder::new(NlMsgType::RTM_GETQDISC, NLM_F_REQUEST | NLM_F_DUMP);
    builder.append(&TcMsg::new().with_ifindex(ifindex as i32));
    builder
}

/// A qdisc as reported by RTM_NEWQDISC.
#[derive(Debug, Clone, Default)]
pub struct QdiscInfo {
    /// Interface index.
    pub ifindex: u32,
    /// Qdisc handle.
    pub handle: u32,
    /// Parent handle.
    pub parent: u32,
    /// Qdisc kind.
    pub kind: String,
    /// Raw TCA_OPTIONS payload.
    pub options: Vec<u8>,
}

impl QdiscInfo {
    /// Decode netem's base options.
    pub fn netem_qopt(&self) -> Option<TcNetemQopt> {
        if self.kind != "netem" {
            return None;
        }
        TcNetemQopt::read_from_prefix(&self.options)
            .ok()
            .map(|(qopt, _)| qopt)
    }

    /// Decode tbf's TCA_TBF_PARMS.
    pub fn tbf_qopt(&self) -> Option<tbf::TcTbfQopt> {
        if self.kind != "tbf" {
            return None;
        }
        AttrIter::new(&self.options)
            .find(|(kind, _)| *kind == tbf::TCA_TBF_PARMS)
            .and_then(|(_, data)| tbf::TcTbfQopt::read_from_prefix(data).ok())
            .map(|(qopt, _)| qopt)
    }
}

impl FromNetlink for QdiscInfo {
    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header = parse_header(input, TcMsg::SIZE)?;
        let header = TcMsg::from_bytes(header).map_err(|_| cut())?;

        let mut info = QdiscInfo {
            ifindex: header.tcm_ifindex as u32,
            handle: header.tcm_handle,
            parent: header.tcm_parent,
            ..Default::default()
        };

        while !input.is_empty() {
            let (attr_type, data) = parse_attr(input)?;
            match attr_type {
                tca::KIND => info.kind = parse_string_from_bytes(data),
                tca::OPTIONS => info.options = data.to_vec(),
                _ => {}
            }
        }

        Ok(info)
    }
}
