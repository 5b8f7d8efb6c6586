mod common;

use common::*;
use stm32_adv_nwk::{
    BufferId, Capability, Error, PawrDataType, ResponseParameters, SlotId, SubeventData,
    config::{MAX_PAWR_RESPONSE_SUBEVENT_COUNT, PAWR_SUBEVENT_DATA_COUNT_MAX},
};

const FULL: Capability = Capability::PeriodicAdvertisingWithResponses;

fn subevents(data: &[u8], n: u8) -> Vec<SubeventData<'_>> {
    (0..n)
        .map(|i| SubeventData {
            subevent: i,
            response_slot_start: 0,
            response_slot_count: 4,
            data,
        })
        .collect()
}

fn subevent_slots(nwk: &stm32_adv_nwk::AdvNwk<MockLinkLayer>) -> Vec<SlotId> {
    match nwk.link_layer().last() {
        Some(Call::Subevents { subevents, .. }) => subevents
            .iter()
            .map(|(_, buffer, _)| match buffer {
                Some(BufferId::Subevent(id)) => *id,
                other => panic!("expected a subevent buffer, got {other:?}"),
            })
            .collect(),
        other => panic!("unexpected call {other:?}"),
    }
}

#[test]
fn subevent_data_is_copied_and_queued() {
    let mut nwk = nwk(FULL);

    nwk.hci_le_set_periodic_advertising_subevent_data(PERIODIC_SET, &subevents(&[3; 40], 2))
        .unwrap();

    match nwk.link_layer().last() {
        Some(Call::Subevents { handle, subevents }) => {
            assert_eq!(*handle, PERIODIC_SET);
            assert_eq!(subevents.len(), 2);
            assert_eq!(subevents[1].0, 1);
            assert_eq!(subevents[1].2, vec![3; 40]);
            assert_ne!(subevents[0].1, subevents[1].1);
        }
        other => panic!("unexpected call {other:?}"),
    }
    assert_eq!(
        nwk.pawr_buffers().subevent_num_available(),
        PAWR_SUBEVENT_DATA_COUNT_MAX - 2
    );

    for id in subevent_slots(&nwk) {
        assert!(!nwk.aci_hal_pawr_data_free_event_preprocess(id, PawrDataType::Subevent));
    }
    assert_eq!(
        nwk.pawr_buffers().subevent_num_available(),
        PAWR_SUBEVENT_DATA_COUNT_MAX
    );
}

#[test]
fn more_subevents_than_free_buffers() {
    let mut nwk = nwk(FULL);

    nwk.hci_le_set_periodic_advertising_subevent_data(PERIODIC_SET, &subevents(&[1; 10], 5))
        .unwrap();
    assert_eq!(nwk.pawr_buffers().subevent_num_available(), 3);
    let calls = nwk.link_layer().calls.len();

    assert_eq!(
        nwk.hci_le_set_periodic_advertising_subevent_data(PERIODIC_SET, &subevents(&[2; 10], 5)),
        Err(Error::CommandDisallowed)
    );
    assert_eq!(nwk.pawr_buffers().subevent_num_available(), 3);
    assert_eq!(nwk.link_layer().calls.len(), calls);
}

#[test]
fn refused_subevents_are_freed() {
    let mut nwk = nwk(FULL);

    nwk.link_layer_mut().fail_next = Some(Error::CommandDisallowed);
    assert_eq!(
        nwk.hci_le_set_periodic_advertising_subevent_data(PERIODIC_SET, &subevents(&[1; 10], 3)),
        Err(Error::CommandDisallowed)
    );
    assert_eq!(
        nwk.pawr_buffers().subevent_num_available(),
        PAWR_SUBEVENT_DATA_COUNT_MAX
    );
}

#[test]
fn oversized_subevent_rolls_back() {
    let mut nwk = nwk(FULL);

    let small = [1; 10];
    let big = [2; 250];
    let items = [
        SubeventData {
            subevent: 0,
            response_slot_start: 0,
            response_slot_count: 1,
            data: &small,
        },
        SubeventData {
            subevent: 1,
            response_slot_start: 0,
            response_slot_count: 1,
            data: &big,
        },
    ];

    assert_eq!(
        nwk.hci_le_set_periodic_advertising_subevent_data(PERIODIC_SET, &items),
        Err(Error::MemoryCapacityExceeded)
    );
    assert_eq!(
        nwk.pawr_buffers().subevent_num_available(),
        PAWR_SUBEVENT_DATA_COUNT_MAX
    );
    assert!(nwk.link_layer().calls.is_empty());
}

#[test]
fn subevent_handle_checks() {
    let mut nwk = nwk(FULL);
    let items = subevents(&[1; 10], 1);

    assert_eq!(
        nwk.hci_le_set_periodic_advertising_subevent_data(0xF0, &items),
        Err(Error::InvalidHciCmdParams)
    );
    assert_eq!(
        nwk.hci_le_set_periodic_advertising_subevent_data(0x30, &items),
        Err(Error::UnknownAdvertisingIdentifier)
    );
}

#[test]
fn response_data() {
    let mut nwk = nwk(FULL);
    let params = ResponseParameters {
        sync_handle: 0x0001,
        request_event: 0x1234,
        request_subevent: 2,
        response_subevent: 2,
        response_slot: 5,
    };

    nwk.hci_le_set_periodic_advertising_response_data(&params, &[9; 247])
        .unwrap();
    let id = match nwk.link_layer().last() {
        Some(Call::Response {
            params: p,
            buffer: Some(BufferId::Response(id)),
            data,
        }) => {
            assert_eq!(p, &params);
            assert_eq!(data.len(), 247);
            *id
        }
        other => panic!("unexpected call {other:?}"),
    };
    assert_eq!(
        nwk.pawr_buffers().resp_num_available(),
        MAX_PAWR_RESPONSE_SUBEVENT_COUNT - 1
    );

    // Freeing as the wrong type leaves the response buffer allocated.
    nwk.aci_hal_pawr_data_free_event_preprocess(id, PawrDataType::Subevent);
    assert_eq!(
        nwk.pawr_buffers().resp_num_available(),
        MAX_PAWR_RESPONSE_SUBEVENT_COUNT - 1
    );
    nwk.aci_hal_pawr_data_free_event_preprocess(id, PawrDataType::Response);
    assert_eq!(
        nwk.pawr_buffers().resp_num_available(),
        MAX_PAWR_RESPONSE_SUBEVENT_COUNT
    );
}

#[test]
fn response_data_limits() {
    let mut nwk = nwk(FULL);
    let params = ResponseParameters::default();

    assert_eq!(
        nwk.hci_le_set_periodic_advertising_response_data(&params, &[0; 248]),
        Err(Error::MemoryCapacityExceeded)
    );

    for _ in 0..MAX_PAWR_RESPONSE_SUBEVENT_COUNT {
        nwk.hci_le_set_periodic_advertising_response_data(&params, &[1; 4])
            .unwrap();
    }
    assert_eq!(
        nwk.hci_le_set_periodic_advertising_response_data(&params, &[1; 4]),
        Err(Error::MemoryCapacityExceeded)
    );
}

#[test]
fn refused_response_is_freed() {
    let mut nwk = nwk(FULL);

    nwk.link_layer_mut().fail_next = Some(Error::Other(0x02));
    assert_eq!(
        nwk.hci_le_set_periodic_advertising_response_data(&ResponseParameters::default(), &[1]),
        Err(Error::Other(0x02))
    );
    assert_eq!(
        nwk.pawr_buffers().resp_num_available(),
        MAX_PAWR_RESPONSE_SUBEVENT_COUNT
    );
}

#[test]
fn pawr_needs_pawr_support() {
    let mut nwk = nwk(Capability::PeriodicAdvertising);

    assert_eq!(
        nwk.hci_le_set_periodic_advertising_subevent_data(PERIODIC_SET, &subevents(&[1], 1)),
        Err(Error::UnknownHciCommand)
    );
    assert_eq!(
        nwk.hci_le_set_periodic_advertising_response_data(&ResponseParameters::default(), &[1]),
        Err(Error::UnknownHciCommand)
    );
}
